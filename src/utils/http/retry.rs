//! Retry logic for HTTP operations

use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_backoff: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            exponential_backoff: true,
        }
    }
}

impl RetryConfig {
    /// A config that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }
}

/// Errors that know whether a retry could succeed
pub trait Retryable {
    /// Whether the same request may succeed if issued again
    fn is_retryable(&self) -> bool;

    /// Server-provided delay before the next attempt, in seconds
    fn retry_after(&self) -> Option<u64> {
        None
    }
}

/// Execute an operation with retry logic
///
/// The operation runs once plus up to `max_attempts` retries. Non-retryable
/// errors are returned immediately.
pub async fn execute_with_retry<F, Fut, T, E>(operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= config.max_attempts || !error.is_retryable() {
                    return Err(error);
                }
                let delay = calculate_delay(&error, attempt, config);
                tracing::debug!(
                    "retrying after {:?} (attempt {}/{}): {}",
                    delay,
                    attempt + 1,
                    config.max_attempts,
                    error
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Calculate delay for retry attempt
fn calculate_delay<E: Retryable>(error: &E, attempt: usize, config: &RetryConfig) -> Duration {
    if let Some(retry_after) = error.retry_after() {
        return std::cmp::min(Duration::from_secs(retry_after), config.max_delay);
    }
    if config.exponential_backoff {
        calculate_exponential_delay(attempt, config)
    } else {
        config.base_delay
    }
}

/// Calculate exponential backoff delay
fn calculate_exponential_delay(attempt: usize, config: &RetryConfig) -> Duration {
    let factor = 2_u32.saturating_pow(attempt as u32);
    let exponential_delay = config.base_delay.saturating_mul(factor);
    std::cmp::min(exponential_delay, config.max_delay)
}
