//! Configuration management for tastegenome.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API credentials, the local callback address,
//! per-source collection limits and the rate limit policy.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)
//!
//! Every getter reports problems as [`CollectError::Config`]; the command layer
//! prints them and exits.

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::error::{CollectError, Result};

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_SCOPE: &str = "user-read-recently-played user-top-read user-library-read";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Spotify never returns more than this many items for recent plays or top tracks.
pub const MAX_WINDOW_LIMIT: usize = 50;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the data directory if it doesn't exist and loads environment
/// variables from `<data dir>/.env`. A missing `.env` file is not an error;
/// the variables may just as well come from the process environment.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/tastegenome/.env`
/// - macOS: `~/Library/Application Support/tastegenome/.env`
/// - Windows: `%LOCALAPPDATA%/tastegenome/.env`
///
/// or in `$TASTEGENOME_DATA_DIR/.env` when that variable is set.
///
/// # Errors
///
/// Returns an error if the data directory cannot be created or the `.env`
/// file exists but cannot be parsed.
pub async fn load_env() -> Result<()> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir).await?;

    let path = dir.join(".env");
    if path.is_file() {
        dotenv::from_path(&path)
            .map_err(|e| CollectError::Config(format!("cannot load {}: {e}", path.display())))?;
    }
    Ok(())
}

/// Returns the directory all local state lives in.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = env::var("TASTEGENOME_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("tastegenome");
    path
}

/// Location of the cached OAuth token.
pub fn token_cache_path() -> PathBuf {
    data_dir().join("cache/token.json")
}

/// Location of the collection snapshot written by `collect`.
pub fn snapshot_path() -> PathBuf {
    data_dir().join("cache/spotify_collection.json")
}

/// Everything the PKCE authenticator needs.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub callback_timeout: Duration,
    /// Tokens expiring within this window are refreshed before use.
    pub refresh_margin: Duration,
}

impl AuthConfig {
    /// Builds an auth configuration with Spotify's endpoints and defaults.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: DEFAULT_SCOPE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            callback_timeout: Duration::from_secs(300),
            refresh_margin: Duration::from_secs(300),
        }
    }

    /// Reads the auth configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Config`] when `SPOTIFY_API_AUTH_CLIENT_ID` is
    /// missing or a numeric setting cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            spotify_client_id()?,
            var_or("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI),
        );
        config.scope = var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE);
        config.auth_url = var_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL);
        config.token_url = var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL);
        config.callback_timeout = Duration::from_secs(parse_var("CALLBACK_TIMEOUT_SECS", 300)?);
        Ok(config)
    }
}

/// Spacing and retry settings shared by every Web API call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Minimum time between the start of two consecutive calls.
    pub min_interval: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// `Retry-After` hints above this are not waited out.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retry_after: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            min_interval: Duration::from_millis(parse_var("RATE_LIMIT_INTERVAL_MS", 1000)?),
            max_retries: parse_var("RATE_LIMIT_MAX_RETRIES", defaults.max_retries)?,
            base_delay: Duration::from_millis(parse_var("RATE_LIMIT_BASE_DELAY_MS", 1000)?),
            max_delay: Duration::from_millis(parse_var("RATE_LIMIT_MAX_DELAY_MS", 30_000)?),
            max_retry_after: defaults.max_retry_after,
        })
    }
}

/// Upper bounds on how many items each source contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectLimits {
    pub recent: usize,
    pub top: usize,
    pub saved: usize,
}

impl Default for CollectLimits {
    fn default() -> Self {
        Self {
            recent: MAX_WINDOW_LIMIT,
            top: MAX_WINDOW_LIMIT,
            saved: 500,
        }
    }
}

impl CollectLimits {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            recent: parse_var("COLLECT_RECENT_LIMIT", MAX_WINDOW_LIMIT)?,
            top: parse_var("COLLECT_TOP_LIMIT", MAX_WINDOW_LIMIT)?,
            saved: parse_var("COLLECT_SAVED_LIMIT", 500)?,
        }
        .clamped())
    }

    /// Caps the recent and top windows at what Spotify can return.
    pub fn clamped(self) -> Self {
        Self {
            recent: self.recent.min(MAX_WINDOW_LIMIT),
            top: self.top.min(MAX_WINDOW_LIMIT),
            saved: self.saved,
        }
    }
}

/// Returns the Spotify API client ID for authentication.
///
/// Retrieves the `SPOTIFY_API_AUTH_CLIENT_ID` environment variable which
/// contains the client ID obtained when registering the application with
/// Spotify's developer platform. PKCE needs no client secret.
///
/// # Errors
///
/// Returns [`CollectError::Config`] if the variable is unset or empty.
pub fn spotify_client_id() -> Result<String> {
    match env::var("SPOTIFY_API_AUTH_CLIENT_ID") {
        Ok(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(CollectError::Config(
            "SPOTIFY_API_AUTH_CLIENT_ID must be set (create an app at https://developer.spotify.com/dashboard)"
                .to_string(),
        )),
    }
}

/// Returns the Spotify Web API base URL.
///
/// Retrieves `SPOTIFY_API_URL`, falling back to `https://api.spotify.com/v1`.
/// Overriding it is mostly useful to point the collector at a local fake.
pub fn spotify_apiurl() -> String {
    var_or("SPOTIFY_API_URL", DEFAULT_API_URL)
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| CollectError::Config(format!("{key} has an invalid value: {raw}"))),
        _ => Ok(default),
    }
}
