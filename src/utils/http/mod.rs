//! Shared HTTP utilities for the remote store and completion providers
//!
//! Client setup, header construction and retry with backoff live here so the
//! REST store and the completion provider build requests the same way.

use std::time::Duration;

pub mod client;
pub mod headers;
pub mod retry;

pub use client::{HttpClient, HttpClientConfig};
pub use headers::{CommonHeaders, CompletionHeaders, HeaderBuilder, ProviderHeaders, StoreHeaders};
pub use retry::{execute_with_retry, RetryConfig, Retryable};

/// Default timeout for HTTP requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of retry attempts
pub const DEFAULT_RETRY_ATTEMPTS: usize = 2;

/// Default delay between retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Extract a retry-after value (seconds) from a JSON error body
pub fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("retry_after")
        .and_then(|v| v.as_u64())
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|v| v.as_u64())
        })
}
