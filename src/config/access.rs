//! API key resolution: environment variables take precedence over the config file

/// Name under which the store key is resolved (`ASTRA_STORE_API_KEY`)
pub const STORE_KEY_NAME: &str = "astra_store";

/// Centralized API key resolution logic
pub struct ApiKeyResolver;

impl ApiKeyResolver {
    /// Get the key for `name`, preferring `<NAME>_API_KEY` from the environment
    pub fn resolve_api_key(name: &str, config_api_key: Option<&str>) -> Option<String> {
        if let Ok(api_key) = std::env::var(Self::env_key_name(name)) {
            if !api_key.trim().is_empty() {
                return Some(api_key);
            }
        }
        config_api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| key.to_string())
    }

    /// Environment variable consulted for `name`
    pub fn env_key_name(name: &str) -> String {
        format!("{}_API_KEY", name.to_uppercase().replace('-', "_"))
    }

    /// Where the key for `name` would come from
    pub fn key_status(name: &str, config_api_key: Option<&str>) -> ApiKeyStatus {
        let env_var = Self::env_key_name(name);
        let has_env_key = std::env::var(&env_var)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        let has_config_key = config_api_key.map_or(false, |k| !k.trim().is_empty());

        match (has_env_key, has_config_key) {
            (true, _) => ApiKeyStatus::Environment(env_var),
            (false, true) => ApiKeyStatus::Config,
            (false, false) => ApiKeyStatus::Missing(env_var),
        }
    }
}

/// Status of API key availability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyStatus {
    /// Key available from environment variable
    Environment(String),
    /// Key available from config file
    Config,
    /// Key missing, shows expected env var name
    Missing(String),
}

impl ApiKeyStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self, ApiKeyStatus::Missing(_))
    }

    pub fn display(&self) -> String {
        match self {
            ApiKeyStatus::Environment(var) => format!("from ${}", var),
            ApiKeyStatus::Config => "from config file".to_string(),
            ApiKeyStatus::Missing(var) => format!("missing (set ${})", var),
        }
    }
}
