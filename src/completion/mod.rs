//! Conversational completion provider abstraction and implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::utils::http::{extract_retry_after, Retryable};

pub mod openai;

pub use openai::OpenAiProvider;

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Error types for completion requests
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimit { retry_after: Option<u64> },

    #[error("Invalid model: {model}")]
    InvalidModel { model: String },

    #[error("Request failed: {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },
}

impl Retryable for CompletionError {
    fn is_retryable(&self) -> bool {
        match self {
            CompletionError::RateLimit { .. } => true,
            CompletionError::Network(_) => true,
            CompletionError::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            CompletionError::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Map an HTTP error status and body to a [`CompletionError`]
pub fn parse_http_error(status: u16, body: &str, model: &str) -> CompletionError {
    match status {
        429 => CompletionError::RateLimit {
            retry_after: extract_retry_after(body),
        },
        401 | 403 => CompletionError::Authentication {
            message: "Invalid API key or insufficient permissions".to_string(),
        },
        400 | 404 if body.contains("model")
            && (body.contains("not found") || body.contains("does not exist")) =>
        {
            CompletionError::InvalidModel {
                model: model.to_string(),
            }
        }
        _ => CompletionError::RequestFailed {
            status,
            message: body.to_string(),
        },
    }
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One entry of a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// A stateless request/response completion service
///
/// Implementations take the whole conversation on every call and return the
/// assistant's reply text. An empty string means the provider answered with
/// no content.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g. "openai", "openrouter")
    fn provider_name(&self) -> &str;

    /// Request one completion for `messages`
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError>;
}

/// Factory for creating completion providers
pub struct CompletionProviderFactory;

impl CompletionProviderFactory {
    /// Create a provider by name
    pub fn create_provider(
        provider_name: &str,
        api_key: Option<String>,
        base_url: Option<String>,
        generation: GenerationConfig,
    ) -> Result<Arc<dyn CompletionProvider>, CompletionError> {
        let name = provider_name.to_lowercase();
        if !Self::list_providers().contains(&name.as_str()) {
            return Err(CompletionError::UnknownProvider { name });
        }
        let api_key = api_key.ok_or_else(|| CompletionError::Authentication {
            message: format!("{} API key not provided", name),
        })?;

        let provider = match name.as_str() {
            "openrouter" => OpenAiProvider::openrouter(api_key, base_url, generation)?,
            _ => OpenAiProvider::openai(api_key, base_url, generation)?,
        };
        Ok(Arc::new(provider))
    }

    /// List all available provider names
    pub fn list_providers() -> Vec<&'static str> {
        vec!["openai", "openrouter"]
    }
}
