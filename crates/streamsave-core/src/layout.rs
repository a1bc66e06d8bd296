//! On-disk layout for a StreamSave data root.
//!
//! All paths hang off one explicitly supplied root directory, so callers
//! (and tests) decide where the engine lives rather than the engine
//! reaching for ambient global state.

use crate::error::EngineError;
use crate::namer::sanitize_component;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Directory name nested under `Downloads/` for ordinary downloads.
pub const APP_DIR_NAME: &str = "StreamSave";

/// Resolves destination directories and the registry snapshot path.
#[derive(Clone, Debug)]
pub struct StorageLayout {
    data_root: PathBuf,
}

impl StorageLayout {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Path of the persisted registry snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_root.join("downloads.json")
    }

    /// Directory for ordinary downloads, optionally nested one level deeper
    /// by a sanitized caller-supplied subdirectory. Created if absent.
    pub async fn download_dir(&self, subdirectory: Option<&str>) -> Result<PathBuf, EngineError> {
        let mut dir = self.data_root.join("Downloads").join(APP_DIR_NAME);
        if let Some(sub) = subdirectory.and_then(sanitize_component) {
            dir.push(sub);
        }
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Cache directory for streaming downloads. The host may purge this
    /// subtree independently of the engine.
    pub async fn streaming_dir(&self) -> Result<PathBuf, EngineError> {
        let dir = self.data_root.join("cache").join("streaming");
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}
