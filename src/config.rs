//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;

use crate::session::SESSION_STORAGE_KEY;
use crate::storage::validate_key;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/auth";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const FALLBACK_STORAGE_DIR: &str = ".portal-auth";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid { var: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for AuthTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Base URL of the auth endpoints, without trailing slash.
    pub api_url: String,
    pub storage_dir: PathBuf,
    pub session_key: String,
    pub timeouts: AuthTimeouts,
}

impl AuthConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORTAL_AUTH_API_URL`: default `http://localhost:8080/api/auth`
    /// - `PORTAL_AUTH_STORAGE_DIR`: default platform data dir
    /// - `PORTAL_AUTH_SESSION_KEY`: default `auth_session`
    /// - `PORTAL_AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PORTAL_AUTH_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is not a positive integer, the API URL
    /// is not an http(s) URL, or the session key cannot name a storage file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = parse_api_url(env_var("PORTAL_AUTH_API_URL").as_deref())?;
        let storage_dir = env_var("PORTAL_AUTH_STORAGE_DIR").map_or_else(default_storage_dir, PathBuf::from);
        let session_key = parse_session_key(env_var("PORTAL_AUTH_SESSION_KEY"))?;
        let timeouts = AuthTimeouts {
            request_secs: env_parse_secs("PORTAL_AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_secs("PORTAL_AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self { api_url, storage_dir, session_key, timeouts })
    }
}

/// Non-empty value of `key`, if set.
fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_owned()),
        _ => None,
    }
}

fn env_parse_secs(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = env_var(key) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        Ok(_) => Err(ConfigError::Invalid { var: key, value: raw, reason: "must be greater than zero".into() }),
        Err(e) => Err(ConfigError::Invalid { var: key, value: raw, reason: e.to_string() }),
    }
}

fn parse_session_key(raw: Option<String>) -> Result<String, ConfigError> {
    let key = raw.unwrap_or_else(|| SESSION_STORAGE_KEY.to_owned());
    match validate_key(&key) {
        Ok(()) => Ok(key),
        Err(e) => Err(ConfigError::Invalid { var: "PORTAL_AUTH_SESSION_KEY", value: key, reason: e.to_string() }),
    }
}

fn parse_api_url(raw: Option<&str>) -> Result<String, ConfigError> {
    let url = raw.unwrap_or(DEFAULT_API_URL).trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            var: "PORTAL_AUTH_API_URL",
            value: url.to_owned(),
            reason: "expected an http:// or https:// URL".into(),
        });
    }
    Ok(url.to_owned())
}

fn default_storage_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "portal-auth")
        .map_or_else(|| PathBuf::from(FALLBACK_STORAGE_DIR), |dirs| dirs.data_local_dir().to_path_buf())
}
