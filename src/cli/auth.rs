use crate::{error, success};

pub async fn auth() {
    let authenticator = super::authenticator();

    match authenticator.authorize_interactive().await {
        Ok(bundle) => success!(
            "Authentication successful! Token cached at {} (scopes: {}).",
            authenticator.store().path().display(),
            bundle.scope
        ),
        Err(e) => error!("Authentication failed: {}", e),
    }
}
