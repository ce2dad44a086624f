//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Backend API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Resource settings.
    #[serde(default)]
    pub resources: ResourceConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }

        Ok(())
    }
}

/// Backend API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the internal API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint path, relative to `base_url`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl ApiConfig {
    /// Validates the API section.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute HTTP(S) URL or a
    /// required field is empty or zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::ValidationError {
            message: format!("Invalid api.base_url '{}': {e}", self.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid api.base_url '{}': scheme must be http or https",
                    self.base_url
                ),
            });
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "api.endpoint cannot be empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "api.timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.token_env.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "api.token_env cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Reads the bearer token from the configured environment variable.
    ///
    /// Blank values are treated as absent.
    #[must_use]
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

/// Default environment variable for the bearer token.
pub const DEFAULT_TOKEN_ENV: &str = "ACADEMIADEPOLITIE_JWT_TOKEN";

fn default_base_url() -> String {
    "https://www.academiadepolitie.com/api/internal".to_string()
}

fn default_endpoint() -> String {
    "profile_for_conversation.php".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

/// Resource configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// User whose data the `user://` resources expose.
    #[serde(default = "default_resource_user_id")]
    pub user_id: i64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            user_id: default_resource_user_id(),
        }
    }
}

const fn default_resource_user_id() -> i64 {
    4001
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
