use std::{future::Future, io::ErrorKind, path::PathBuf, sync::Mutex};

use crate::{config, error::Result, types::TokenBundle, warning};

use super::write_atomic;

/// Durable home of the one cached [`TokenBundle`].
pub trait TokenStore {
    /// `Ok(None)` when nothing has been cached yet.
    fn load(&self) -> impl Future<Output = Result<Option<TokenBundle>>> + Send;

    fn save(&self, bundle: &TokenBundle) -> impl Future<Output = Result<()>> + Send;
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new(config::token_cache_path())
    }
}

impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<TokenBundle>> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(bundle) => Ok(Some(bundle)),
            Err(e) => {
                warning!(
                    "Ignoring unreadable token cache at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, bundle: &TokenBundle) -> Result<()> {
        let json = serde_json::to_string_pretty(bundle)?;
        write_atomic(&self.path, &json, true).await?;
        Ok(())
    }
}

/// Keeps the bundle in memory; handy where nothing should touch the disk.
#[derive(Default)]
pub struct MemoryTokenStore {
    bundle: Mutex<Option<TokenBundle>>,
}

impl MemoryTokenStore {
    pub fn new(bundle: Option<TokenBundle>) -> Self {
        Self {
            bundle: Mutex::new(bundle),
        }
    }

    pub fn current(&self) -> Option<TokenBundle> {
        self.bundle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<TokenBundle>> {
        Ok(self.current())
    }

    async fn save(&self, bundle: &TokenBundle) -> Result<()> {
        *self
            .bundle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(bundle.clone());
        Ok(())
    }
}
