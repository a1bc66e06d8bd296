//! Download engine façade.
//!
//! `DownloadEngine` is the public surface of the crate: it coordinates the
//! namer, the registry, and the transfer workers, and broadcasts lifecycle
//! events to any number of subscribers. It is a constructed service object:
//! the data root and the notifier are passed in explicitly, and everything
//! the engine owns hangs off that root.

use crate::engine::worker::TransferWorker;
use crate::error::EngineError;
use crate::layout::StorageLayout;
use crate::namer;
use crate::notify::{Notifier, NoopNotifier};
use crate::registry::Registry;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamsave_types::{Download, DownloadStatus, EngineEvent};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const READ_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle to a running transfer worker.
struct WorkerHandle {
    _join: tokio::task::JoinHandle<()>,
    /// Cancellation token polled by the worker at chunk granularity.
    cancelled: Arc<AtomicBool>,
}

pub struct DownloadEngine {
    registry: Arc<Registry>,
    layout: StorageLayout,
    client: Client,
    /// Active transfers by download id. At most one worker per id; the
    /// mapping is ephemeral and empty after a restart.
    active: Arc<RwLock<HashMap<Uuid, WorkerHandle>>>,
    event_tx: broadcast::Sender<EngineEvent>,
    notifier: Arc<dyn Notifier>,
}

impl DownloadEngine {
    pub async fn new(data_root: impl Into<PathBuf>) -> Result<Self, EngineError> {
        Self::with_notifier(data_root, Arc::new(NoopNotifier)).await
    }

    pub async fn with_notifier(
        data_root: impl Into<PathBuf>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, EngineError> {
        let layout = StorageLayout::new(data_root);
        tokio::fs::create_dir_all(layout.data_root()).await?;

        let registry = Arc::new(Registry::load(layout.snapshot_path()).await);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            registry,
            layout,
            client,
            active: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            notifier,
        })
    }

    /// Subscribe to lifecycle events. Every subscriber sees every event.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Start a download and return its record immediately; the transfer
    /// itself runs on its own task.
    pub async fn start(
        &self,
        url: &str,
        file_name: Option<&str>,
        mime_type: &str,
        subdirectory: Option<&str>,
    ) -> Result<Download, EngineError> {
        if url.trim().is_empty() {
            return Err(EngineError::EmptyUrl);
        }
        let dir = self.layout.download_dir(subdirectory).await?;
        self.begin(url, file_name, mime_type, dir).await
    }

    /// Start a download into the streaming cache, where a player can read
    /// the file while it is still growing.
    pub async fn start_streaming(
        &self,
        url: &str,
        file_name: Option<&str>,
        mime_type: &str,
    ) -> Result<Download, EngineError> {
        if url.trim().is_empty() {
            return Err(EngineError::EmptyUrl);
        }
        let dir = self.layout.streaming_dir().await?;
        self.begin(url, file_name, mime_type, dir).await
    }

    async fn begin(
        &self,
        url: &str,
        file_name: Option<&str>,
        mime_type: &str,
        dir: PathBuf,
    ) -> Result<Download, EngineError> {
        let resolved = namer::resolve_file_name(url, file_name, mime_type);
        let file_path = dir.join(&resolved);
        let download = Download::new(resolved, url.to_string(), file_path, mime_type.to_string());

        self.registry.insert(download.clone()).await?;
        self.spawn_worker(download.clone()).await;
        Ok(download)
    }

    async fn spawn_worker(&self, download: Download) {
        let id = download.id;
        let mut active = self.active.write().await;
        if active.contains_key(&id) {
            warn!(%id, "download already has an active worker");
            return;
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let worker = TransferWorker::new(
            download,
            Arc::clone(&self.registry),
            self.client.clone(),
            self.event_tx.clone(),
            Arc::clone(&self.notifier),
            Arc::clone(&cancelled),
        );

        let tasks = Arc::clone(&self.active);
        let token = Arc::clone(&cancelled);
        let join = tokio::spawn(async move {
            worker.run().await;
            // Deregister only our own handle; a retry may already have
            // replaced the mapping with a fresh worker.
            let mut tasks = tasks.write().await;
            if let Some(handle) = tasks.get(&id) {
                if Arc::ptr_eq(&handle.cancelled, &token) {
                    tasks.remove(&id);
                }
            }
        });

        active.insert(id, WorkerHandle { _join: join, cancelled });
    }

    /// Signal the active worker (if any) to stop and mark the record paused
    /// right away, so observers see the change without waiting for the
    /// worker to unwind. Idempotent when no worker is active.
    pub async fn cancel(&self, id: Uuid) -> Result<(), EngineError> {
        if let Some(handle) = self.active.write().await.remove(&id) {
            handle.cancelled.store(true, Ordering::Release);
            info!(%id, "signalled cancel");
        }

        self.registry
            .update(id, |d| {
                if matches!(
                    d.status,
                    DownloadStatus::Pending | DownloadStatus::Downloading
                ) {
                    d.status = DownloadStatus::Paused;
                }
                d.speed_bps = 0;
                d.eta_seconds = 0;
            })
            .await?;
        Ok(())
    }

    /// Cancel, remove the file (best effort), drop the record, and clear
    /// any notification shown for this id.
    pub async fn delete(&self, id: Uuid) -> Result<(), EngineError> {
        self.cancel(id).await?;

        if let Some(download) = self.registry.get(id).await {
            // The file may never have been created.
            let _ = tokio::fs::remove_file(&download.file_path).await;
        }

        self.registry.remove(id).await?;
        self.notifier.clear(id);
        Ok(())
    }

    /// Restart a paused or failed download from byte zero: the partial file
    /// is deleted and a fresh worker starts over on the same record.
    pub async fn retry(&self, id: Uuid) -> Result<Download, EngineError> {
        let current = self
            .registry
            .get(id)
            .await
            .ok_or(EngineError::NotFound(id))?;
        if !current.status.is_retryable() {
            return Err(EngineError::InvalidOperation(format!(
                "cannot retry a {:?} download",
                current.status
            )));
        }

        // A leftover handle would violate one-worker-per-id; signal it and
        // drop the mapping before spawning the replacement.
        if let Some(handle) = self.active.write().await.remove(&id) {
            handle.cancelled.store(true, Ordering::Release);
        }

        let _ = tokio::fs::remove_file(&current.file_path).await;

        let fresh = self
            .registry
            .update(id, |d| {
                d.status = DownloadStatus::Pending;
                d.bytes_transferred = 0;
                d.speed_bps = 0;
                d.eta_seconds = 0;
                d.updated_at = Utc::now();
            })
            .await?
            .ok_or(EngineError::NotFound(id))?;

        self.spawn_worker(fresh.clone()).await;
        Ok(fresh)
    }

    /// All records, most recently updated first.
    pub async fn list(&self) -> Vec<Download> {
        self.registry.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Download, EngineError> {
        self.registry
            .get(id)
            .await
            .ok_or(EngineError::NotFound(id))
    }

    /// Number of transfers with a live worker.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }
}
