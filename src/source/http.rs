use std::str::FromStr;
use std::sync::atomic::Ordering;

use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;

use crate::config::PriceApiConfig;
use crate::errors::FetchError;
use crate::metrics::METRICS;
use crate::schema::PricePoint;

use super::adapter::PriceSource;
use super::retry::{RetryPolicy, retry_with_backoff};

/// Longest body excerpt kept in a parse error.
const BODY_EXCERPT_LEN: usize = 64;

/// HTTP price source.
///
/// Issues `GET <endpoint>` with `Authorization: <scheme> <api_key>` and
/// expects the body to be a bare decimal number, e.g. `64123.45`.
///
/// Every attempt is bounded by the client timeout; the attempts as a
/// whole are bounded by the retry policy.
pub struct HttpPriceSource {
    client: Client,
    endpoint: String,
    authorization: HeaderValue,
    policy: RetryPolicy,
}

impl HttpPriceSource {
    /// Builds a source with its own client, using the configured
    /// per-attempt timeout and retry budget.
    pub fn new(cfg: &PriceApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Self::with_client(client, cfg, RetryPolicy::new(cfg.max_retries))
    }

    /// Builds a source around an existing client.
    ///
    /// The caller is responsible for the client's timeout.
    pub fn with_client(
        client: Client,
        cfg: &PriceApiConfig,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let mut authorization = HeaderValue::from_str(&format!("{} {}", cfg.scheme, cfg.api_key))
            .map_err(|_| FetchError::Client("credential is not a valid header value".into()))?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            authorization,
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One HTTP round-trip, classified for the retry driver.
    async fn attempt(&self) -> Result<PricePoint, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, self.authorization.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transient(describe_request_error(&e)))?;

        classify_status(response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transient(format!("failed to read body: {e}")))?;

        let value = parse_price(&body)?;

        Ok(PricePoint::from_api(value, Utc::now()))
    }
}

#[async_trait::async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_price(&self) -> Result<PricePoint, FetchError> {
        let result = retry_with_backoff(&self.policy, |attempt| {
            log::debug!("fetching price from {} (attempt {})", self.endpoint, attempt);
            self.attempt()
        })
        .await;

        if let Err(e) = &result {
            METRICS.fetch_failures.fetch_add(1, Ordering::Relaxed);
            if matches!(e, FetchError::ParseFailure { .. }) {
                METRICS.parse_errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        result
    }
}

/// Maps an HTTP status onto the retry taxonomy.
///
/// - 2xx: success
/// - 5xx, 408 and 404: transient
/// - anything else: rejected, not retried
pub fn classify_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }

    if status.is_server_error()
        || status == StatusCode::NOT_FOUND
        || status == StatusCode::REQUEST_TIMEOUT
    {
        return Err(FetchError::Transient(format!("status {}", status.as_u16())));
    }

    Err(FetchError::Rejected {
        status: status.as_u16(),
    })
}

/// Parses a raw response body into a price.
///
/// Surrounding whitespace is ignored; anything else that is not a
/// plain decimal number is a parse failure.
pub fn parse_price(body: &str) -> Result<Decimal, FetchError> {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return Err(FetchError::ParseFailure {
            body: String::new(),
            reason: "empty body".into(),
        });
    }

    Decimal::from_str(trimmed).map_err(|e| FetchError::ParseFailure {
        body: trimmed.chars().take(BODY_EXCERPT_LEN).collect(),
        reason: e.to_string(),
    })
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request failed: {e}")
    }
}
