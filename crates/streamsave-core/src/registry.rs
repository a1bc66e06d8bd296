//! In-memory download registry with a durable JSON mirror.
//!
//! The registry is the only shared mutable state in the engine: a map of
//! download id to record behind an `RwLock`, snapshotted in full to disk
//! after every mutation. Mutations are copy-and-replace: the stored record
//! is cloned, the closure edits the clone, and the clone is written back,
//! so concurrent readers never observe a half-applied update.

use crate::error::EngineError;
use std::collections::HashMap;
use std::path::PathBuf;
use streamsave_types::{Download, DownloadStatus};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Registry {
    records: RwLock<HashMap<Uuid, Download>>,
    snapshot_path: PathBuf,
    /// Serializes snapshot writes so two mutations cannot interleave file IO.
    write_lock: Mutex<()>,
}

impl Registry {
    /// Load the registry from its snapshot.
    ///
    /// Missing, unreadable, or corrupt snapshots all produce an empty
    /// registry; boot never fails on persisted state. Records persisted as
    /// `Downloading` have no worker behind them after a restart and are
    /// reconciled to `Paused` so that retry applies to them.
    pub async fn load(snapshot_path: PathBuf) -> Self {
        let records = match fs::read_to_string(&snapshot_path).await {
            Ok(raw) => match serde_json::from_str::<Vec<Download>>(&raw) {
                Ok(list) => {
                    let mut map = HashMap::with_capacity(list.len());
                    for mut download in list {
                        if download.status == DownloadStatus::Downloading {
                            info!(
                                id = %download.id,
                                file = %download.file_name,
                                "reconciling interrupted download to paused"
                            );
                            download.status = DownloadStatus::Paused;
                        }
                        map.insert(download.id, download);
                    }
                    map
                }
                Err(err) => {
                    warn!(%err, path = %snapshot_path.display(), "discarding unreadable download snapshot");
                    HashMap::new()
                }
            },
            Err(err) => {
                debug!(%err, path = %snapshot_path.display(), "no download snapshot to load");
                HashMap::new()
            }
        };

        Self {
            records: RwLock::new(records),
            snapshot_path,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Download> {
        self.records.read().await.get(&id).cloned()
    }

    /// All records, most recently updated first.
    pub async fn list(&self) -> Vec<Download> {
        let mut all: Vec<Download> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    pub async fn insert(&self, download: Download) -> Result<(), EngineError> {
        self.records.write().await.insert(download.id, download);
        self.persist().await
    }

    /// Apply `apply` to a copy of the stored record and write the copy back.
    ///
    /// Returns the new value, or `Ok(None)` when the id is no longer
    /// registered (e.g. deleted while a worker was unwinding) — in that
    /// case nothing is written and the record stays gone.
    pub async fn update<F>(&self, id: Uuid, apply: F) -> Result<Option<Download>, EngineError>
    where
        F: FnOnce(&mut Download),
    {
        let updated = {
            let mut records = self.records.write().await;
            match records.get(&id) {
                Some(current) => {
                    let mut next = current.clone();
                    apply(&mut next);
                    records.insert(id, next.clone());
                    Some(next)
                }
                None => None,
            }
        };

        if updated.is_some() {
            self.persist().await?;
        }
        Ok(updated)
    }

    pub async fn remove(&self, id: Uuid) -> Result<Option<Download>, EngineError> {
        let removed = self.records.write().await.remove(&id);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Overwrite the snapshot with the full record set.
    async fn persist(&self) -> Result<(), EngineError> {
        let snapshot: Vec<Download> = self.records.read().await.values().cloned().collect();
        let json = serde_json::to_string_pretty(&snapshot)?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.snapshot_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.snapshot_path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::path::{Path, PathBuf};

    fn record(name: &str) -> Download {
        Download::new(
            name.to_string(),
            format!("https://example.com/{name}"),
            PathBuf::from(format!("/tmp/{name}")),
            "video/mp4".to_string(),
        )
    }

    fn snapshot(dir: &Path) -> PathBuf {
        dir.join("downloads.json")
    }

    #[tokio::test]
    async fn mutations_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(snapshot(dir.path())).await;

        let download = record("a.mp4");
        let id = download.id;
        registry.insert(download).await.unwrap();
        registry
            .update(id, |d| {
                d.bytes_transferred = 42;
                d.status = DownloadStatus::Failed;
            })
            .await
            .unwrap();

        let reloaded = Registry::load(snapshot(dir.path())).await;
        let restored = reloaded.get(id).await.unwrap();
        assert_eq!(restored.bytes_transferred, 42);
        assert_eq!(restored.status, DownloadStatus::Failed);
        // Transient fields are not persisted.
        assert_eq!(restored.speed_bps, 0);
        assert_eq!(restored.eta_seconds, 0);
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(snapshot(dir.path()), "{ not json").unwrap();

        let registry = Registry::load(snapshot(dir.path())).await;
        assert!(registry.list().await.is_empty());

        // The registry is usable after discarding the corrupt state.
        registry.insert(record("b.mp4")).await.unwrap();
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn interrupted_downloads_are_reconciled_to_paused() {
        let dir = tempfile::tempdir().unwrap();
        let mut download = record("c.mp4");
        download.status = DownloadStatus::Downloading;
        download.bytes_transferred = 1000;
        let id = download.id;
        std::fs::write(
            snapshot(dir.path()),
            serde_json::to_string(&vec![download]).unwrap(),
        )
        .unwrap();

        let registry = Registry::load(snapshot(dir.path())).await;
        let restored = registry.get(id).await.unwrap();
        assert_eq!(restored.status, DownloadStatus::Paused);
        assert_eq!(restored.bytes_transferred, 1000);
    }

    #[tokio::test]
    async fn list_orders_by_timestamp_descending() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(snapshot(dir.path())).await;

        let mut old = record("old.mp4");
        old.updated_at = Utc::now() - Duration::hours(2);
        let mut fresh = record("fresh.mp4");
        fresh.updated_at = Utc::now();

        registry.insert(old).await.unwrap();
        registry.insert(fresh).await.unwrap();

        let listed = registry.list().await;
        assert_eq!(listed[0].file_name, "fresh.mp4");
        assert_eq!(listed[1].file_name, "old.mp4");
    }

    #[tokio::test]
    async fn updating_a_missing_id_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(snapshot(dir.path())).await;

        let result = registry
            .update(Uuid::new_v4(), |d| d.bytes_transferred = 1)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(!snapshot(dir.path()).exists());
    }
}
