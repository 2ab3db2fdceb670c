//! Shared reqwest client setup

use super::headers::DEFAULT_USER_AGENT;
use super::retry::RetryConfig;
use super::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
use reqwest::Client;
use std::time::Duration;

/// Store round trips are small; fail fast so the board reconciles quickly
const STORE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeouts, retry budget and identity for one remote service
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 5,
        }
    }
}

impl HttpClientConfig {
    /// Settings for the REST store
    pub fn for_store() -> Self {
        Self {
            timeout: STORE_TIMEOUT,
            ..Self::default()
        }
    }

    /// Settings for completion providers, which can take a while to answer
    pub fn for_completion() -> Self {
        Self::default()
    }

    pub fn with_retries(mut self, attempts: usize, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }
}

/// A configured reqwest client plus the retry policy that goes with it
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Backoff doubles from `retry_delay`, capped at ten times it
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.config.retry_attempts,
            base_delay: self.config.retry_delay,
            max_delay: self.config.retry_delay * 10,
            exponential_backoff: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_completion_settings() {
        assert_eq!(HttpClientConfig::for_store().timeout, Duration::from_secs(15));
        assert_eq!(HttpClientConfig::for_completion().timeout, DEFAULT_TIMEOUT);

        let config = HttpClientConfig::for_store().with_retries(1, Duration::from_millis(50));
        let client = HttpClient::new(config).unwrap();
        let retry = client.retry_config();
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.max_delay, Duration::from_millis(500));
    }
}
