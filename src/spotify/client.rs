use std::sync::Arc;

use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;

use crate::{
    error::{CollectError, Result},
    ratelimit::{CallFailure, RateLimiter},
    utils,
};

/// Authenticated GET access to the Spotify Web API.
///
/// Every request goes through the shared [`RateLimiter`], so callers never
/// sleep or retry on their own.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    limiter: Arc<RateLimiter>,
}

impl SpotifyClient {
    pub fn new(api_url: impl Into<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            limiter,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetches `{api_url}{path}` with `query` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// - [`CollectError::RateLimitExceeded`] once 429s or transient failures
    ///   used up the retry budget
    /// - [`CollectError::Api`] for any other non-success status
    /// - [`CollectError::Http`] when the body cannot be decoded
    pub async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        self.limiter
            .execute(path, || self.attempt::<T>(&url, token, query))
            .await
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, CallFailure> {
        let response = match self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if is_transient(&err) => return Err(CallFailure::Transient(err.to_string())),
            Err(err) => return Err(CallFailure::Fatal(err.into())),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(utils::parse_retry_after);
            return Err(CallFailure::Throttled { retry_after });
        }

        if status.is_server_error() {
            return Err(CallFailure::Transient(format!("server error ({status})")));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CallFailure::Fatal(CollectError::Api {
                status: status.as_u16(),
                message,
            }));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| CallFailure::Fatal(err.into()))
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}
