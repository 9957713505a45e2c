use std::sync::Arc;

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::{Mutex, oneshot};

use crate::types::CallbackParams;

/// One-shot slot the first usable redirect is delivered through.
pub type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(sender): Extension<CallbackSender>,
) -> Html<&'static str> {
    if params.code.is_none() && params.error.is_none() {
        return Html("<h4>Missing authorization code.</h4>");
    }

    let denied = params.error.is_some();
    let Some(tx) = sender.lock().await.take() else {
        return Html("<h4>Authorization already handled.</h4><p>You may close this window.</p>");
    };
    let _ = tx.send(params);

    if denied {
        Html("<h2>Authorization denied.</h2><p>You may close this window.</p>")
    } else {
        Html("<h2>Authorization received.</h2><p>You may close this window.</p>")
    }
}

pub async fn fallback() -> Html<&'static str> {
    Html("<h4>Nothing to see here.</h4><p>You may close this window.</p>")
}
