use std::time::Duration;

use thiserror::Error;

/// Every failure the collection engine can surface.
///
/// Authentication variants are fatal to a run. `RateLimitExceeded` and `Api`
/// only ever degrade the source that produced them.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Missing or invalid setup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The authorization handshake or code exchange failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No cached token exists yet.
    #[error("not authenticated, run `tastegenome auth` first")]
    NotAuthenticated,

    /// The refresh token was rejected; the user has to authorize again.
    #[error("token refresh failed, run `tastegenome auth` again: {0}")]
    ReauthRequired(String),

    /// The browser step was never completed.
    #[error("no authorization callback received within {0:?}")]
    CallbackTimeout(Duration),

    /// Retry budget exhausted for one call.
    #[error("rate limit exceeded after {attempts} attempts: {reason}")]
    RateLimitExceeded { attempts: u32, reason: String },

    /// Spotify answered with a status that is not worth retrying.
    #[error("spotify api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CollectError {
    /// Whether recovering from this error requires running `auth` again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CollectError::Auth(_)
                | CollectError::NotAuthenticated
                | CollectError::ReauthRequired(_)
                | CollectError::CallbackTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CollectError>;
