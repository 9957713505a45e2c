use std::path::PathBuf;

use crate::{config, error::Result, types::CollectionSnapshot};

use super::write_atomic;

pub struct SnapshotManager {
    path: PathBuf,
}

impl SnapshotManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<CollectionSnapshot> {
        let content = async_fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn persist(&self, snapshot: &CollectionSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.path, &json, false).await?;
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new(config::snapshot_path())
    }
}
