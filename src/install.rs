//! Registers this server in the MCP client's configuration file.
//!
//! The entry lives under `mcp.servers.academiadepolitie` and carries the
//! bearer token in the server's environment. Every other key in the file
//! is preserved.
//!
//! # Client Configuration Locations
//!
//! The first existing file wins; otherwise the first candidate is created.
//!
//! - **Windows:** `%APPDATA%\Claude\claude_desktop_config.json`,
//!   `%LOCALAPPDATA%\Claude\claude_desktop_config.json`
//! - **macOS:** `~/Library/Application Support/Claude/claude_desktop_config.json`,
//!   `~/.config/claude-desktop/config.json`
//! - **Linux:** `~/.config/claude-desktop/config.json`,
//!   `~/.config/Claude/claude_desktop_config.json`

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::error::InstallError;
use crate::mcp::protocol::SERVER_NAME;

/// Expected prefix of a JWT (base64 of `{"`).
pub const TOKEN_PREFIX: &str = "eyJ";

/// Shortest token accepted.
pub const MIN_TOKEN_LEN: usize = 50;

/// Checks that `token` looks like a JWT and returns it trimmed.
///
/// This is a sanity check against pasting the wrong thing; the token's
/// structure and signature are not verified.
///
/// # Errors
///
/// Returns [`InstallError::InvalidToken`] if the prefix or length is wrong.
pub fn validate_token(token: &str) -> Result<&str, InstallError> {
    let token = token.trim();
    if !token.starts_with(TOKEN_PREFIX) || token.len() < MIN_TOKEN_LEN {
        return Err(InstallError::InvalidToken {
            min_len: MIN_TOKEN_LEN,
        });
    }
    Ok(token)
}

/// Candidate client configuration paths for this platform, in priority order.
#[must_use]
pub fn client_config_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        [dirs::config_dir(), dirs::data_local_dir()]
            .into_iter()
            .flatten()
            .map(|dir| dir.join("Claude").join("claude_desktop_config.json"))
            .collect()
    } else if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|home| {
                vec![
                    home.join("Library")
                        .join("Application Support")
                        .join("Claude")
                        .join("claude_desktop_config.json"),
                    home.join(".config").join("claude-desktop").join("config.json"),
                ]
            })
            .unwrap_or_default()
    } else {
        dirs::home_dir()
            .map(|home| {
                vec![
                    home.join(".config").join("claude-desktop").join("config.json"),
                    home.join(".config")
                        .join("Claude")
                        .join("claude_desktop_config.json"),
                ]
            })
            .unwrap_or_default()
    }
}

/// Returns the first existing candidate, or creates the first one with an
/// empty server table.
///
/// # Errors
///
/// Returns an error if there are no candidates or the file cannot be created.
pub fn find_or_create_client_config(candidates: &[PathBuf]) -> Result<PathBuf, InstallError> {
    if let Some(existing) = candidates.iter().find(|path| path.exists()) {
        return Ok(existing.clone());
    }

    let path = candidates.first().ok_or(InstallError::NoConfigPath)?;
    let io_error = |source| InstallError::Io {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let skeleton = json!({ "mcp": { "servers": {} } });
    let contents = serde_json::to_string_pretty(&skeleton).map_err(InstallError::Serialise)?;
    std::fs::write(path, contents).map_err(io_error)?;

    tracing::info!(path = %path.display(), "Created client configuration");
    Ok(path.clone())
}

/// The server entry written into the client configuration.
#[must_use]
pub fn server_entry(command: &Path, token_env: &str, token: &str) -> Value {
    let mut env = Map::new();
    env.insert(token_env.to_string(), Value::String(token.to_string()));

    json!({
        "command": command.to_string_lossy(),
        "args": [],
        "env": env,
    })
}

/// Inserts `entry` at `mcp.servers.<SERVER_NAME>`, creating intermediate
/// objects and keeping every sibling key.
#[must_use]
pub fn merge_server_entry(config: Value, entry: Value) -> Value {
    let mut root = match config {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut mcp = take_object(&mut root, "mcp");
    let mut servers = take_object(&mut mcp, "servers");
    servers.insert(SERVER_NAME.to_string(), entry);
    mcp.insert("servers".to_string(), Value::Object(servers));
    root.insert("mcp".to_string(), Value::Object(mcp));

    Value::Object(root)
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

/// Writes the server entry into the client configuration.
///
/// Uses `client_config` when given, otherwise the platform candidates.
/// An unreadable or malformed existing file is replaced.
///
/// # Errors
///
/// Returns an error if the token is rejected, the executable path cannot be
/// resolved, or the configuration cannot be written.
pub fn install(
    token: &str,
    client_config: Option<&Path>,
    token_env: &str,
) -> Result<PathBuf, InstallError> {
    let token = validate_token(token)?;
    let command = std::env::current_exe().map_err(InstallError::ExecutablePath)?;

    let path = match client_config {
        Some(path) => path.to_path_buf(),
        None => find_or_create_client_config(&client_config_candidates())?,
    };

    write_server_entry(&path, server_entry(&command, token_env, token))?;
    Ok(path)
}

/// Merges `entry` into the JSON file at `path`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the file or its directory cannot be written.
pub fn write_server_entry(path: &Path, entry: Value) -> Result<(), InstallError> {
    let existing = std::fs::read_to_string(path)
        .ok()
        .and_then(|contents| serde_json::from_str::<Value>(&contents).ok())
        .unwrap_or_else(|| {
            tracing::warn!(path = %path.display(), "Client configuration missing or unreadable, starting fresh");
            json!({})
        });

    let merged = merge_server_entry(existing, entry);
    let contents = serde_json::to_string_pretty(&merged).map_err(InstallError::Serialise)?;

    let io_error = |source| InstallError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, contents).map_err(io_error)
}
