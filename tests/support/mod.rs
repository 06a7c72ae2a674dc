#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use price_collector::config::PriceApiConfig;
use price_collector::source::{HttpPriceSource, RetryPolicy};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const API_KEY: &str = "test-key";

/// Raw requests seen by the upstream stub.
pub type Seen = Arc<Mutex<Vec<String>>>;

/// Serves one canned response per connection, in order, then stops
/// listening so further attempts fail to connect.
pub async fn upstream(responses: Vec<(u16, &'static str)>) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::default();

    tokio::spawn({
        let seen = seen.clone();
        async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        }
    });

    (format!("http://{addr}/price"), seen)
}

/// Accepts connections and never answers them.
pub async fn stalled_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    format!("http://{addr}/price")
}

/// HTTP source with a short per-attempt timeout and millisecond backoff.
pub fn source(endpoint: &str, max_retries: u32, timeout: Duration) -> HttpPriceSource {
    let cfg: PriceApiConfig = serde_json::from_value(serde_json::json!({
        "endpoint": endpoint,
        "api_key": API_KEY,
        "scheme": "Bearer",
        "max_retries": max_retries,
    }))
    .unwrap();

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .unwrap();

    let policy = RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(10));
    HttpPriceSource::with_client(client, &cfg, policy).unwrap()
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
