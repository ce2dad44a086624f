//! Error types for academiadepolitie-mcp.
//!
//! # Security Note
//!
//! Error messages must NEVER include the bearer token. Variants that carry
//! backend or configuration details only ever hold URLs, paths and status
//! codes.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while binding `tools/call` arguments to a tool's typed
/// argument struct. Binding happens before the handler runs.
#[derive(Error, Debug)]
pub enum ArgumentError {
    /// The `arguments` value was not a JSON object.
    #[error("arguments for tool '{tool}' must be an object")]
    NotAnObject {
        /// Tool being invoked.
        tool: &'static str,
    },

    /// The arguments did not match the tool's input schema.
    #[error("invalid arguments for tool '{tool}': {source}")]
    Invalid {
        /// Tool being invoked.
        tool: &'static str,
        /// The underlying deserialisation error (missing, unknown or mistyped field).
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of the outbound backend call.
///
/// These are tool-business failures: they are reported inside a normal
/// `result` payload, never as a JSON-RPC error.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The endpoint URL could not be formed from the configured base.
    #[error("invalid backend URL: {0}")]
    Url(String),

    /// Connection, TLS or timeout failure.
    #[error("API call failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API call failed: HTTP {status}")]
    Status {
        /// HTTP status code returned.
        status: u16,
    },

    /// The response body was not valid JSON.
    #[error("API call failed: invalid JSON response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Faults raised while routing or handling a single JSON-RPC request.
///
/// Every variant is reported with the internal-error code and its display
/// text as the message.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The request named a method outside the routing table.
    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    /// `tools/call` named a tool that is not registered.
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// `resources/read` named a URI that is not registered.
    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),

    /// The message was JSON but not a usable request object.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The method's `params` did not have the expected shape.
    #[error("Invalid params for {method}: {message}")]
    InvalidParams {
        /// Method being invoked.
        method: &'static str,
        /// What was wrong.
        message: String,
    },

    /// Tool arguments failed to bind.
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// A handler result could not be serialised.
    #[error("failed to serialise result: {0}")]
    Serialisation(#[from] serde_json::Error),
}

/// Errors from the headless installer.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The token failed the format sanity check.
    #[error("token must start with 'eyJ' and be at least {min_len} characters long")]
    InvalidToken {
        /// Minimum accepted length.
        min_len: usize,
    },

    /// No client configuration location could be determined.
    #[error("could not determine the client configuration path for this platform")]
    NoConfigPath,

    /// The path of the running executable could not be determined.
    #[error("failed to resolve the server executable path")]
    ExecutablePath(#[source] std::io::Error),

    /// Reading or writing the client configuration failed.
    #[error("failed to update client configuration: {path}")]
    Io {
        /// Client configuration path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The merged configuration could not be serialised.
    #[error("failed to serialise client configuration")]
    Serialise(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn dispatch_errors_name_the_missing_target() {
        assert_eq!(
            DispatchError::ToolNotFound("nope".to_string()).to_string(),
            "Unknown tool: nope"
        );
        assert!(DispatchError::ResourceNotFound("user://x".to_string())
            .to_string()
            .contains("user://x"));
        assert!(DispatchError::MethodNotFound("foo/bar".to_string())
            .to_string()
            .contains("foo/bar"));
    }

    #[test]
    fn status_error_has_api_prefix() {
        let msg = BackendError::Status { status: 401 }.to_string();
        assert_eq!(msg, "API call failed: HTTP 401");
    }

    #[test]
    fn argument_error_is_transparent_in_dispatch() {
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let error = DispatchError::from(ArgumentError::Invalid {
            tool: "get_student_data",
            source,
        });
        assert!(error.to_string().starts_with("invalid arguments for tool 'get_student_data'"));
    }
}
