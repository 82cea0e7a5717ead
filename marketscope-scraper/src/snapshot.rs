use crate::error::Result;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists raw fetch responses so extraction can be replayed later even
/// after selector logic changes. Paths are derived from the marketplace
/// name and capture time.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self, marketplace: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let path = self.root.join(format!("{}_{}.html", marketplace, stamp));

        fs::write(&path, content)?;
        debug!("Saved snapshot to {}", path.display());

        Ok(path)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new("data/raw")
    }
}
