//! # CLI Module
//!
//! This module provides the command-line interface layer for tastegenome. It
//! implements every user-facing command and wires configuration, the token
//! cache, the rate limiter and the collection orchestrator together.
//!
//! ## Commands
//!
//! - [`auth`] - runs the Spotify OAuth 2.0 PKCE flow in the browser and caches the token
//! - [`collect`] - fetches all five track sources plus audio features and writes the snapshot
//! - [`analyze`] - loads the snapshot and prints per-source, artist and feature tables
//! - [`full`] - `collect` followed by `analyze`
//!
//! ## Architecture
//!
//! ```text
//! CLI Layer (User Interface)
//!     ↓
//! Collection Orchestrator (collector)
//!     ↓
//! Spotify Integration (auth, client, fetchers)
//!     ↓
//! Management Layer (token cache, snapshot file)
//! ```
//!
//! ## Error Handling
//!
//! Library code returns typed [`CollectError`](crate::CollectError)s. This layer
//! is the only place that turns them into output and an exit status:
//!
//! - authentication failures print guidance to run `tastegenome auth` again
//! - sources that could not be fetched are reported as warnings and the run
//!   continues with whatever the other sources returned
//! - everything else that stops a command exits with status 1 through
//!   [`error!`](crate::error!)
//!
//! ## Usage
//!
//! ```bash
//! tastegenome auth                 # Authorize once in the browser
//! tastegenome collect --limit 200  # Collect, at most 200 saved tracks
//! tastegenome analyze              # Inspect the last snapshot
//! tastegenome full                 # Both in one go
//! ```

mod analyze;
mod auth;
mod collect;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{self, AuthConfig},
    error,
    management::FileTokenStore,
    spotify::Authenticator,
};

pub use analyze::{analyze, feature_coverage, top_artists};
pub use auth::auth;
pub use collect::{collect, full};

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

fn authenticator() -> Authenticator<FileTokenStore> {
    let auth_config = match AuthConfig::from_env() {
        Ok(auth_config) => auth_config,
        Err(e) => error!(
            "{}\nSet it in {} or in the environment.",
            e,
            config::data_dir().join(".env").display()
        ),
    };

    match Authenticator::new(auth_config, FileTokenStore::default()) {
        Ok(auth) => auth,
        Err(e) => error!("{}", e),
    }
}
