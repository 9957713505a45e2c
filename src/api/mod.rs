//! # API Module
//!
//! HTTP handlers served by the short-lived authorization listener in
//! [`crate::server`]. Spotify redirects the browser to the configured redirect
//! URI after the user approves (or denies) access; these handlers hand the
//! query parameters to the waiting authenticator and answer the browser with a
//! small HTML page.
//!
//! ## Endpoints
//!
//! - [`callback`] - the redirect URI's path. Forwards `code`, `state` or
//!   `error` exactly once.
//! - [`fallback`] - every other path (favicons, stray reloads) gets a plain
//!   "you may close this window" page.

mod callback;

pub use callback::{CallbackSender, callback, fallback};
