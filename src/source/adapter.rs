use crate::errors::FetchError;
use crate::schema::PricePoint;

/// PriceSource is the abstraction layer between:
/// - The generic collector loop
/// - A concrete upstream price API
///
/// Each implementation must:
/// - Perform one logical fetch per call (retries included)
/// - Parse the upstream payload into a `PricePoint`
/// - Stamp the point with the instant it was parsed
///
/// THREAD SAFETY:
/// - Must be Send + Sync
/// - The collector holds the source behind an `Arc`
///
/// MUST NOT:
/// - Mutate shared state other than runtime metrics
/// - Record the sample anywhere (the collector owns that step)
///
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Short identifier used in log lines.
    fn name(&self) -> &str;

    /// Fetches the current price.
    ///
    /// OUTPUT:
    /// - `Ok(PricePoint)` with note "from api"
    /// - `Err(FetchError::ParseFailure)` for an unparseable body
    /// - `Err(FetchError::Rejected)` for a non-retryable status
    /// - `Err(FetchError::Unavailable)` once retries are exhausted
    ///
    async fn fetch_price(&self) -> Result<PricePoint, FetchError>;
}
