//! Configuration loader
//!
//! Loads [`AuthConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `FORCEAUTH_CLIENT_ID` is set, the configuration comes from the
//!    environment
//! 2. Otherwise the first config file found is parsed
//! 3. The result is validated before it is returned
//!
//! ## Environment Variables
//! - `FORCEAUTH_CLIENT_ID`: Connected app consumer key (required)
//! - `FORCEAUTH_CLIENT_SECRET`: Consumer secret
//! - `FORCEAUTH_REDIRECT_URI`: Redirect target
//! - `FORCEAUTH_SANDBOX`: Use the sandbox host (true/false)
//! - `FORCEAUTH_PROMPT`: Prompt values, space or comma separated
//! - `FORCEAUTH_SCOPES`: Scopes, space or comma separated
//! - `FORCEAUTH_PREFER_EPHEMERAL_SESSION`: Private browser session
//!   (true/false)
//! - `FORCEAUTH_ISSUER_URL`: Custom issuer base URL
//! - `FORCEAUTH_HTTP_TIMEOUT_SECS`: Network timeout in seconds
//!
//! ## File Locations
//! The loader probes `./forceauth.toml`, `./config.toml` and
//! `../forceauth.toml`, in that order. Files use the `AuthConfig` field names.

use std::path::{Path, PathBuf};

use forceauth_domain::{AuthConfig, ConfigError, Prompt};

const ENV_CLIENT_ID: &str = "FORCEAUTH_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "FORCEAUTH_CLIENT_SECRET";
const ENV_REDIRECT_URI: &str = "FORCEAUTH_REDIRECT_URI";
const ENV_SANDBOX: &str = "FORCEAUTH_SANDBOX";
const ENV_PROMPT: &str = "FORCEAUTH_PROMPT";
const ENV_SCOPES: &str = "FORCEAUTH_SCOPES";
const ENV_PREFER_EPHEMERAL_SESSION: &str = "FORCEAUTH_PREFER_EPHEMERAL_SESSION";
const ENV_ISSUER_URL: &str = "FORCEAUTH_ISSUER_URL";
const ENV_HTTP_TIMEOUT_SECS: &str = "FORCEAUTH_HTTP_TIMEOUT_SECS";

const CONFIG_FILE_CANDIDATES: [&str; 3] = ["forceauth.toml", "config.toml", "../forceauth.toml"];

/// Load configuration from the environment, falling back to a config file
///
/// # Errors
/// Returns `ConfigError` when neither source yields a configuration, a value
/// is malformed, or the result fails validation.
pub fn load() -> Result<AuthConfig, ConfigError> {
    let config = if std::env::var_os(ENV_CLIENT_ID).is_some() {
        let config = load_from_env()?;
        tracing::info!(client_id = %config.client_id, "Configuration loaded from environment variables");
        config
    } else {
        tracing::debug!("{ENV_CLIENT_ID} not set, trying config file");
        load_from_file(None)?
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `FORCEAUTH_CLIENT_ID` is required; every other variable keeps the
/// `AuthConfig` default when unset.
///
/// # Errors
/// Returns `ConfigError::Missing` without a client id and
/// `ConfigError::Invalid` for malformed booleans, prompts or numbers.
pub fn load_from_env() -> Result<AuthConfig, ConfigError> {
    let mut config = AuthConfig::new(env_var(ENV_CLIENT_ID)?);

    config.client_secret = optional_env_var(ENV_CLIENT_SECRET);
    config.redirect_uri = optional_env_var(ENV_REDIRECT_URI);
    config.issuer_url = optional_env_var(ENV_ISSUER_URL);
    config.sandbox = env_bool(ENV_SANDBOX, false)?;
    config.prefer_ephemeral_session = env_bool(ENV_PREFER_EPHEMERAL_SESSION, false)?;

    if let Some(raw) = optional_env_var(ENV_PROMPT) {
        config.prompt = split_list(&raw).map(str::parse::<Prompt>).collect::<Result<_, _>>()?;
    }

    if let Some(raw) = optional_env_var(ENV_SCOPES) {
        config.scopes = split_list(&raw).map(str::to_string).collect();
    }

    if let Some(raw) = optional_env_var(ENV_HTTP_TIMEOUT_SECS) {
        config.http_timeout_secs = raw.trim().parse::<u64>().map_err(|e| {
            ConfigError::invalid(ENV_HTTP_TIMEOUT_SECS, format!("'{raw}' is not a number: {e}"))
        })?;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by extension (`.toml` or `.json`).
///
/// # Errors
/// Returns `ConfigError::Missing` when no file is found, `ConfigError::Io`
/// when it cannot be read, and `ConfigError::Parse` when it is malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthConfig, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::Missing(format!("config file {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConfigError::Missing(format!(
                "{ENV_CLIENT_ID} or a config file in any of the standard locations"
            ))
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)?;
    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<AuthConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid JSON format: {e}"))),
        _ => Err(ConfigError::Parse(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    CONFIG_FILE_CANDIDATES.iter().map(|name| cwd.join(name)).find(|path| path.is_file())
}

fn env_var(key: &str) -> Result<String, ConfigError> {
    optional_env_var(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

/// Set and non-blank.
fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = optional_env_var(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("'{raw}' is not a boolean"))),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|item| !item.is_empty())
}
