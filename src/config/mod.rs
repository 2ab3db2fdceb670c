//! Configuration management for ASTRA

use crate::chat::DEFAULT_CONTEXT_WINDOW;
use crate::completion::{GenerationConfig, DEFAULT_MODEL};
use crate::utils::errors::{AstraError, ConfigError};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub mod access;

pub use access::{ApiKeyResolver, ApiKeyStatus, STORE_KEY_NAME};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote store settings
    pub store: StoreConfig,
    /// Completion provider settings
    pub completion: CompletionConfig,
    /// Chat behaviour
    pub chat: ChatConfig,
    /// Signed-in identity for the CLI
    pub session: SessionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Which [`RemoteStore`](crate::store::RemoteStore) implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process only; nothing survives the process
    Memory,
    /// In-process, snapshotted to a JSON file
    #[default]
    Local,
    /// Hosted PostgREST backend
    Rest,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Local => "local",
            StoreBackend::Rest => "rest",
        })
    }
}

/// Remote store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the REST backend
    pub url: Option<String>,
    /// Anonymous/public key of the REST backend
    pub api_key: Option<String>,
    /// Snapshot file for the local backend
    pub data_file: Option<PathBuf>,
}

/// Completion provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Active provider; none means commands only
    pub provider: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Override of the active provider's endpoint
    pub base_url: Option<String>,
    /// Per-provider credentials
    pub providers: HashMap<String, ProviderConfig>,
}

/// Configuration for a completion provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key for the provider
    pub api_key: Option<String>,
    /// Base URL for the provider API
    pub base_url: Option<String>,
}

/// Chat configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Earlier messages sent along with each new one
    pub context_window: usize,
}

/// Session configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub user_id: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        let generation = GenerationConfig::default();
        Self {
            provider: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: generation.temperature,
            max_tokens: generation.max_tokens,
            base_url: None,
            providers: HashMap::new(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Check that the configuration can be used to build the application
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::Rest {
            let url = self.store.url.as_deref().unwrap_or_default();
            if url.trim().is_empty() {
                return Err(AstraError::validation(
                    "store.url",
                    "the rest backend needs a base URL",
                ));
            }
            if self.store_api_key().is_none() {
                return Err(AstraError::validation(
                    "store.api_key",
                    format!(
                        "no API key for the rest backend; set {} or store.api_key",
                        ApiKeyResolver::env_key_name(STORE_KEY_NAME)
                    ),
                ));
            }
        }

        if self.chat.context_window == 0 {
            return Err(AstraError::validation(
                "chat.context_window",
                "must be at least 1",
            ));
        }

        if let Some(provider) = self.active_provider() {
            if self.provider_api_key(provider).is_none() {
                return Err(AstraError::validation(
                    "completion.api_key",
                    format!(
                        "No API key found for provider '{}'. Set {} or configure it in [completion.providers.{}]",
                        provider,
                        ApiKeyResolver::env_key_name(provider),
                        provider
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Configured completion provider, if any
    pub fn active_provider(&self) -> Option<&str> {
        self.completion
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// API key for a completion provider (environment first)
    pub fn provider_api_key(&self, provider: &str) -> Option<String> {
        ApiKeyResolver::resolve_api_key(
            provider,
            self.completion
                .providers
                .get(provider)
                .and_then(|p| p.api_key.as_deref()),
        )
    }

    /// Endpoint override for a completion provider
    pub fn provider_base_url(&self, provider: &str) -> Option<String> {
        self.completion.base_url.clone().or_else(|| {
            self.completion
                .providers
                .get(provider)
                .and_then(|p| p.base_url.clone())
        })
    }

    /// API key for the REST store (environment first)
    pub fn store_api_key(&self) -> Option<String> {
        ApiKeyResolver::resolve_api_key(STORE_KEY_NAME, self.store.api_key.as_deref())
    }

    /// Snapshot file of the local backend
    pub fn data_file(&self) -> PathBuf {
        self.store.data_file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("astra")
                .join("store.json")
        })
    }

    /// Sampling parameters for completion requests
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            model: self.completion.model.clone(),
            temperature: self.completion.temperature,
            max_tokens: self.completion.max_tokens,
        }
    }
}

/// Configuration manager for loading, saving, and managing application configuration
pub struct ConfigManager {
    config: Config,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load the configuration from the default location, creating it if missing
    pub fn new() -> Result<Self> {
        Self::open(Self::default_config_path()?)
    }

    /// Load the configuration at `path`, creating it with defaults if missing
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let config_path = path.into();
        let config = if config_path.exists() {
            Self::load_config(&config_path)?
        } else {
            let default_config = Config::default();
            Self::save_config(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Write a default configuration to `path`; refuses to overwrite unless `force`
    pub fn init<P: Into<PathBuf>>(path: P, force: bool) -> Result<Self> {
        let config_path = path.into();
        if config_path.exists() && !force {
            return Err(AstraError::validation(
                "config",
                format!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                ),
            ));
        }
        let config = Config::default();
        Self::save_config(&config_path, &config)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        Self::save_config(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> Result<()> {
        if self.config_path.exists() {
            self.config = Self::load_config(&self.config_path)?;
        }
        Ok(())
    }

    /// `<config dir>/astra/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::FileNotFound {
            path: PathBuf::from("config directory"),
        })?;
        Ok(config_dir.join("astra").join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError { source: e })?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError { source: e })
            .map_err(Into::into)
    }

    fn save_config(path: &Path, config: &Config) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError { source: e })?;
            }
        }

        let content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError { source: e })?;

        Ok(())
    }
}
