//! # Spotify Integration Module
//!
//! This module is the integration layer between tastegenome and Spotify's
//! accounts service and Web API. It handles the OAuth flow, all HTTP
//! communication for collection, error classification and rate limiting.
//!
//! ## Architecture
//!
//! ```text
//! Command Layer (CLI)
//!          ↓
//! Collection Orchestrator (collector)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (OAuth 2.0 PKCE, token cache)
//!     ├── Web API client (shared rate limiter, retries)
//!     ├── Track sources (recent, top x3, saved library)
//!     └── Audio features (batched)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! ### Authentication Module
//!
//! [`auth`] - [`Authenticator`] implements the PKCE flow:
//! - **Challenge Generation**: 128-character verifier, S256 challenge, random `state`
//! - **Local Callback**: a temporary listener receives the redirect, with a timeout
//! - **Token Exchange**: code + verifier are exchanged for access and refresh tokens
//! - **Token Refresh**: tokens close to expiry are refreshed exactly once before use
//!
//! ### Client Module
//!
//! [`client`] - [`SpotifyClient`] performs authenticated GETs through the shared
//! [`RateLimiter`](crate::ratelimit::RateLimiter) and classifies every response:
//! - `429 Too Many Requests` is retried after `Retry-After` or an exponential backoff
//! - timeouts, connection failures and `5xx` are retried on the same schedule
//! - any other non-success status fails the call immediately
//!
//! ### Track Sources
//!
//! [`tracks`] - one fetcher per endpoint:
//! - `GET /me/player/recently-played` - up to 50 recent plays with `played_at`
//! - `GET /me/top/tracks` - up to 50 tracks per `short_term`, `medium_term`, `long_term`
//! - `GET /me/tracks` - the saved library, paged by offset, with `added_at`
//!
//! ### Audio Features
//!
//! [`features`] - `GET /audio-features` in batches of 100 ids. Tracks without
//! an analysis are simply missing from the result.
//!
//! ## Error Handling
//!
//! Source fetchers never abort a collection run. A source that still fails
//! after the retry policy is exhausted is reported as
//! [`SourceOutcome::Degraded`](crate::types::SourceOutcome::Degraded) and
//! contributes nothing. Only authentication failures stop a run.

pub mod auth;
pub mod client;
pub mod features;
pub mod tracks;

pub use auth::Authenticator;
pub use client::SpotifyClient;
