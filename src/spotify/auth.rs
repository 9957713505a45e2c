use std::sync::Mutex;

use chrono::Utc;
use reqwest::{Client, Response, Url};

use crate::{
    config::AuthConfig,
    error::{CollectError, Result},
    info,
    management::TokenStore,
    server::CallbackListener,
    types::{AuthorizationRequest, PkceChallenge, TokenBundle, TokenErrorResponse, TokenResponse},
    utils, warning,
};

/// Owns the OAuth 2.0 PKCE token lifecycle: authorize, exchange, cache and
/// refresh.
///
/// The authenticator is the only writer of the [`TokenBundle`]; the
/// [`TokenStore`] it is built with is where that bundle lives between runs.
/// At most one authorization attempt is pending at a time.
pub struct Authenticator<S: TokenStore> {
    config: AuthConfig,
    store: S,
    http: Client,
    pending: Mutex<Option<PkceChallenge>>,
}

impl<S: TokenStore> Authenticator<S> {
    /// Validates `config` and builds an authenticator on top of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Config`] when the client id is empty or the
    /// redirect URI is missing or not a valid URL.
    pub fn new(config: AuthConfig, store: S) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(CollectError::Config("no Spotify client id configured".to_string()));
        }
        if config.redirect_uri.trim().is_empty() {
            return Err(CollectError::Config("no redirect uri configured".to_string()));
        }
        Url::parse(&config.redirect_uri).map_err(|e| {
            CollectError::Config(format!("invalid redirect uri {}: {e}", config.redirect_uri))
        })?;

        Ok(Self {
            config,
            store,
            http: Client::new(),
            pending: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Starts a new authorization attempt.
    ///
    /// Generates a fresh verifier, its S256 challenge and an anti-CSRF
    /// `state`, and builds the Spotify authorize URL the user has to visit.
    /// The challenge replaces any attempt that was still pending.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Config`] if the authorize URL cannot be built.
    pub fn begin_authorization(&self) -> Result<AuthorizationRequest> {
        let challenge = utils::generate_pkce_challenge();

        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_challenge_method", "S256"),
                ("code_challenge", challenge.code_challenge.as_str()),
                ("state", challenge.state.as_str()),
                ("scope", self.config.scope.as_str()),
            ],
        )
        .map_err(|e| {
            CollectError::Config(format!("invalid authorize url {}: {e}", self.config.auth_url))
        })?;

        let request = AuthorizationRequest {
            url: url.into(),
            state: challenge.state.clone(),
            code_verifier: challenge.code_verifier.clone(),
        };
        *self.pending_slot() = Some(challenge);

        Ok(request)
    }

    /// Exchanges an authorization `code` for tokens and caches them.
    ///
    /// `state` and `verifier` must belong to the pending attempt started by
    /// [`begin_authorization`](Self::begin_authorization). The attempt is
    /// discarded once the exchange succeeds.
    ///
    /// # Errors
    ///
    /// - [`CollectError::Auth`] on a state or verifier mismatch, when no
    ///   attempt is pending, or when Spotify rejects the code
    /// - [`CollectError::Http`] when the token endpoint cannot be reached
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
        verifier: &str,
    ) -> Result<TokenBundle> {
        {
            let pending = self.pending_slot();
            match pending.as_ref() {
                None => {
                    return Err(CollectError::Auth(
                        "no authorization attempt in progress".to_string(),
                    ));
                }
                Some(challenge) if challenge.state != state => {
                    return Err(CollectError::Auth(
                        "state parameter does not match the issued one".to_string(),
                    ));
                }
                Some(challenge) if challenge.code_verifier != verifier => {
                    return Err(CollectError::Auth(
                        "code verifier does not belong to this attempt".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("code", code),
                ("code_verifier", verifier),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let bundle = self
            .read_token_response(response, None)
            .await
            .map_err(|reason| CollectError::Auth(format!("code exchange rejected: {reason}")))?;

        self.store.save(&bundle).await?;
        self.discard_pending();
        Ok(bundle)
    }

    /// Returns an access token that is good for at least the refresh margin.
    ///
    /// A cached token that is still fresh is returned without any network
    /// I/O. Otherwise exactly one refresh is attempted and its result is
    /// persisted.
    ///
    /// # Errors
    ///
    /// - [`CollectError::NotAuthenticated`] when nothing is cached
    /// - [`CollectError::ReauthRequired`] when Spotify rejects the refresh
    ///   token
    pub async fn get_valid_token(&self) -> Result<String> {
        let Some(bundle) = self.store.load().await? else {
            return Err(CollectError::NotAuthenticated);
        };

        let margin = self.config.refresh_margin.as_secs() as i64;
        if bundle.is_fresh(Utc::now().timestamp(), margin) {
            return Ok(bundle.access_token);
        }

        info!("Access token expired or expiring soon. Refreshing...");
        let refreshed = self.refresh(&bundle).await?;
        Ok(refreshed.access_token)
    }

    /// Runs the complete browser flow and caches the resulting tokens.
    ///
    /// Binds the callback listener first so the redirect cannot race the
    /// browser, opens the authorize URL (printing it when no browser can be
    /// launched) and waits for the redirect for at most the configured
    /// callback timeout.
    ///
    /// # Errors
    ///
    /// - [`CollectError::CallbackTimeout`] when the user never finishes
    /// - [`CollectError::Auth`] when the user denies access or the exchange
    ///   fails
    pub async fn authorize_interactive(&self) -> Result<TokenBundle> {
        let listener = CallbackListener::bind(&self.config.redirect_uri).await?;
        let request = self.begin_authorization()?;

        if webbrowser::open(&request.url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                request.url
            );
        }
        info!(
            "Waiting for the authorization callback on http://{}{} ...",
            listener.local_addr(),
            listener.path()
        );

        let params = match listener.wait(self.config.callback_timeout).await {
            Ok(params) => params,
            Err(e) => {
                self.discard_pending();
                return Err(e);
            }
        };

        if let Some(error) = params.error {
            self.discard_pending();
            return Err(CollectError::Auth(format!("Spotify denied authorization: {error}")));
        }

        let code = params
            .code
            .ok_or_else(|| CollectError::Auth("callback carried no code".to_string()))?;
        let state = params.state.unwrap_or_default();

        self.complete_authorization(&code, &state, &request.code_verifier)
            .await
    }

    async fn refresh(&self, bundle: &TokenBundle) -> Result<TokenBundle> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", bundle.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await?;

        let refreshed = self
            .read_token_response(response, Some(&bundle.refresh_token))
            .await
            .map_err(CollectError::ReauthRequired)?;

        self.store.save(&refreshed).await?;
        Ok(refreshed)
    }

    /// Turns a token endpoint response into a bundle, or a readable reason.
    ///
    /// Spotify may omit `refresh_token` when refreshing; `previous_refresh`
    /// is kept in that case.
    async fn read_token_response(
        &self,
        response: Response,
        previous_refresh: Option<&str>,
    ) -> std::result::Result<TokenBundle, String> {
        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{} ({})", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("{status}: {body}"),
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| format!("malformed token response: {e}"))?;
        let refresh_token = token
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| "token response carried no refresh token".to_string())?;

        Ok(TokenBundle {
            access_token: token.access_token,
            refresh_token,
            expires_at: Utc::now().timestamp() + token.expires_in,
            scope: token.scope.unwrap_or_else(|| self.config.scope.clone()),
        })
    }

    fn pending_slot(&self) -> std::sync::MutexGuard<'_, Option<PkceChallenge>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn discard_pending(&self) {
        self.pending_slot().take();
    }
}
