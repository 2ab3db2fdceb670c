//! Error types used throughout the application

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ASTRA
#[derive(Error, Debug)]
pub enum AstraError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Completion provider error: {0}")]
    Completion(#[from] crate::completion::CompletionError),

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid date: {input:?} (expected YYYY-MM-DD)")]
    InvalidDate { input: String },

    #[error("Unknown task status: {value:?}")]
    UnknownStatus { value: String },

    #[error("Please sign in to continue")]
    NotSignedIn,

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization/deserialization error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration key: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration: {source}")]
    ReadError {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write configuration: {source}")]
    WriteError {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {source}")]
    ParseError {
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {source}")]
    SerializeError {
        #[source]
        source: toml::ser::Error,
    },
}

impl AstraError {
    /// Add context to an existing error
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        match &mut self {
            Self::Unknown { message } | Self::Validation { message, .. } => {
                *message = format!("{}: {}", context.into(), message);
            }
            Self::NotFound { resource } => {
                *resource = format!("{}: {}", context.into(), resource);
            }
            _ => {
                let original = format!("{}", self);
                return Self::unknown(format!("{}: {}", context.into(), original));
            }
        }
        self
    }

    /// Create a new validation error
    pub fn validation<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid date error
    pub fn invalid_date<S: Into<String>>(input: S) -> Self {
        Self::InvalidDate {
            input: input.into(),
        }
    }

    /// Create a new unknown status error
    pub fn unknown_status<S: Into<String>>(value: S) -> Self {
        Self::UnknownStatus {
            value: value.into(),
        }
    }

    /// Create a new not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a new unknown error
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Whether the error came from a remote collaborator (store or provider)
    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Completion(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Store(_) => "store",
            Self::Completion(_) => "completion",
            Self::Validation { .. } => "validation",
            Self::InvalidDate { .. } => "validation",
            Self::UnknownStatus { .. } => "data",
            Self::NotSignedIn => "auth",
            Self::NotFound { .. } => "notfound",
            Self::Json(_) => "json",
            Self::Toml(_) => "toml",
            Self::Io(_) => "io",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl From<crate::command::CommandError> for AstraError {
    fn from(error: crate::command::CommandError) -> Self {
        use crate::command::CommandError;
        match error {
            CommandError::InvalidDate { input } => AstraError::InvalidDate { input },
            CommandError::EmptyTaskContent => {
                AstraError::validation("content", "task description cannot be empty")
            }
            CommandError::EmptyEventTitle => {
                AstraError::validation("title", "event title cannot be empty")
            }
            CommandError::MalformedSchedule => {
                AstraError::validation("command", "expected: schedule on YYYY-MM-DD \"Event Title\"")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_categories() {
        assert_eq!(AstraError::NotSignedIn.category(), "auth");
        assert_eq!(AstraError::validation("content", "empty").category(), "validation");
        assert_eq!(AstraError::invalid_date("2025-13-20").category(), "validation");
        let store: AstraError = StoreError::unavailable("down").into();
        assert_eq!(store.category(), "store");
        assert!(store.is_remote_failure());
    }

    #[test]
    fn test_with_context() {
        let err = AstraError::validation("content", "empty").with_context("create task");
        assert_eq!(err.to_string(), "Validation error: content: create task: empty");

        let err = AstraError::NotSignedIn.with_context("move");
        assert!(matches!(err, AstraError::Unknown { .. }));
        assert!(err.to_string().contains("Please sign in"));
    }

    #[test]
    fn test_command_error_conversion() {
        let err: AstraError = crate::command::CommandError::InvalidDate {
            input: "2025-02-30".to_string(),
        }
        .into();
        assert!(matches!(err, AstraError::InvalidDate { ref input } if input == "2025-02-30"));
    }
}
