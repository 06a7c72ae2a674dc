//! Price sources
//!
//! This module provides:
//! - The `PriceSource` trait the collector fetches through
//! - The HTTP implementation used in production
//! - The retry/backoff driver shared by implementations
//!
//! The rest of the application must interact exclusively through
//! the `PriceSource` trait.

pub mod adapter;
pub mod http;
pub mod retry;

pub use adapter::PriceSource;
pub use http::HttpPriceSource;
pub use retry::{RetryPolicy, retry_with_backoff};
