//! tastegenome library
//!
//! This library collects a user's Spotify listening history and audio features
//! into a single local snapshot. It includes the OAuth 2.0 PKCE token lifecycle,
//! a rate-limited Web API client, the per-source fetchers and the collection
//! orchestrator that merges everything into one canonical track set.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the local authorization callback
//! - `cli` - Command-line interface implementations
//! - `collector` - Collection orchestrator and track merging
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by every module
//! - `management` - Token cache and snapshot persistence
//! - `ratelimit` - Request spacing, backoff and retry policy
//! - `server` - Short-lived local HTTP listener for OAuth callbacks
//! - `spotify` - Spotify accounts and Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - PKCE primitives and small helpers
//!
//! # Example
//!
//! ```
//! use tastegenome::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> tastegenome::error::Result<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod management;
pub mod ratelimit;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::CollectError;

/// Prints an informational message with a blue bullet point.
///
/// Creates a formatted output line with a distinctive blue "o" indicator
/// followed by the provided message. Used for general information and
/// status updates throughout the application.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// info!("Starting authentication process...");
/// info!("Fetched {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Creates a formatted output line with a green "✓" indicator to signify
/// successful completion of operations. Used to provide positive feedback
/// when operations complete successfully.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// success!("Collected {} unique tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Creates a formatted error output with a red "!" indicator and immediately
/// terminates the program with exit code 1. Used for unrecoverable errors
/// that require immediate program termination.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Behavior
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It is only used from the command layer, never from
/// library code that callers might want to recover from.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// error!("Authentication failed: {}", err);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Creates a formatted output line with a yellow "!" indicator to highlight
/// potential issues or important notices that don't require program termination.
/// Used for recoverable issues or important information that users should notice.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// warning!("Source {} degraded to empty: {}", source, reason);
/// warning!("Rate limited, retrying in {:?}", delay);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
