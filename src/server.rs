use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Extension, Router, routing::get};
use reqwest::Url;
use tokio::{
    net::TcpListener,
    sync::{Mutex, oneshot},
    time::{sleep, timeout},
};

use crate::{
    api::{self, CallbackSender},
    error::{CollectError, Result},
    types::CallbackParams,
};

/// How long in-flight browser connections get to finish after the callback.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Local listener for the single OAuth redirect of one authorization attempt.
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
    addr: SocketAddr,
}

impl CallbackListener {
    /// Binds to the host and port of `redirect_uri`. `localhost` binds to
    /// `127.0.0.1`; port `0` picks a free port.
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| CollectError::Config(format!("invalid redirect uri {redirect_uri}: {e}")))?;

        let host = match url.host_str() {
            None | Some("localhost") => "127.0.0.1",
            Some(host) => host,
        };
        let port = url.port_or_known_default().unwrap_or(8888);
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| CollectError::Config(format!("invalid callback address: {e}")))?;

        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        Ok(Self {
            listener,
            path: url.path().to_string(),
            addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Serves until the first redirect carrying `code` or `error` arrives, or
    /// `wait_for` elapses. The listener is shut down in both cases.
    pub async fn wait(self, wait_for: Duration) -> Result<CallbackParams> {
        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(tx)));

        let app = Router::new()
            .route(&self.path, get(api::callback))
            .fallback(api::fallback)
            .layer(Extension(sender));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let mut server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let outcome = tokio::select! {
            params = rx => params.map_err(|_| {
                CollectError::Auth("callback listener stopped unexpectedly".to_string())
            }),
            () = sleep(wait_for) => Err(CollectError::CallbackTimeout(wait_for)),
        };

        let _ = shutdown_tx.send(());
        if timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            server.abort();
        }

        outcome
    }
}
