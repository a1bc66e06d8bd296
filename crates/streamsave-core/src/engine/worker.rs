//! Transfer worker - one cancellable network-to-disk transfer.
//!
//! A worker owns the whole lifetime of a single transfer: it marks the
//! record `Downloading`, streams the response body to the destination file,
//! publishes throttled progress samples, and writes the terminal (or
//! paused) state back into the registry. Failures stay inside the worker;
//! nothing here can take down a sibling transfer or the engine.

use crate::engine::progress::ProgressEstimator;
use crate::error::EngineError;
use crate::notify::Notifier;
use crate::registry::Registry;
use chrono::Utc;
use futures::StreamExt;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use streamsave_types::{Download, DownloadStatus, EngineEvent};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Minimum wall time between progress samples; the final chunk always
/// produces one regardless.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

pub(crate) struct TransferWorker {
    download: Download,
    registry: Arc<Registry>,
    client: Client,
    event_tx: broadcast::Sender<EngineEvent>,
    notifier: Arc<dyn Notifier>,
    cancelled: Arc<AtomicBool>,
}

impl TransferWorker {
    pub(crate) fn new(
        download: Download,
        registry: Arc<Registry>,
        client: Client,
        event_tx: broadcast::Sender<EngineEvent>,
        notifier: Arc<dyn Notifier>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            download,
            registry,
            client,
            event_tx,
            notifier,
            cancelled,
        }
    }

    pub(crate) async fn run(mut self) {
        match self.transfer().await {
            Ok(()) => self.finish_completed().await,
            Err(EngineError::Cancelled) => self.finish_paused().await,
            Err(err) => self.finish_failed(err).await,
        }
    }

    async fn transfer(&mut self) -> Result<(), EngineError> {
        let id = self.download.id;

        if self.cancelled.load(Ordering::Acquire) {
            return Err(EngineError::Cancelled);
        }

        info!(%id, url = %self.download.url, "starting transfer");
        let Some(started) = self
            .registry
            .update(id, |d| {
                d.status = DownloadStatus::Downloading;
                d.updated_at = Utc::now();
            })
            .await?
        else {
            // Deleted before the worker got scheduled.
            return Err(EngineError::Cancelled);
        };
        self.notifier.progress(&started, 0);
        let _ = self.event_tx.send(EngineEvent::Progress { download: started });

        let response = self.client.get(&self.download.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Server {
                status: status.as_u16(),
            });
        }

        let total = response.content_length().unwrap_or(0);
        self.download.total_size = total;
        self.registry.update(id, |d| d.total_size = total).await?;

        if let Some(parent) = self.download.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(&self.download.file_path).await?;

        let mut stream = response.bytes_stream();
        let mut estimator = ProgressEstimator::new();
        let mut last_sample = Instant::now();
        let mut transferred: u64 = 0;

        while let Some(next) = stream.next().await {
            // Cooperative cancellation checkpoint: a cancel signalled while
            // this task was blocked in the read is observed here, before the
            // chunk is processed.
            if self.cancelled.load(Ordering::Acquire) {
                let _ = file.flush().await;
                return Err(EngineError::Cancelled);
            }

            let chunk = next?;
            file.write_all(&chunk).await?;
            transferred += chunk.len() as u64;

            // The record never reports more than the declared length, even
            // if the server over-delivers.
            let reported = if total > 0 {
                transferred.min(total)
            } else {
                transferred
            };
            self.download.bytes_transferred = reported;

            let last_chunk = total > 0 && reported == total;
            if last_sample.elapsed() >= SAMPLE_INTERVAL || last_chunk {
                last_sample = Instant::now();
                let (speed, eta) = estimator.sample(reported, total);
                if let Some(updated) = self
                    .registry
                    .update(id, |d| {
                        d.bytes_transferred = reported;
                        d.speed_bps = speed;
                        d.eta_seconds = eta;
                        d.updated_at = Utc::now();
                    })
                    .await?
                {
                    self.notifier.progress(&updated, percent(&updated));
                    let _ = self.event_tx.send(EngineEvent::Progress { download: updated });
                }
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn finish_completed(self) {
        let id = self.download.id;
        let transferred = self.download.bytes_transferred;
        match self
            .registry
            .update(id, |d| {
                d.status = DownloadStatus::Completed;
                d.bytes_transferred = transferred;
                if d.total_size == 0 {
                    d.total_size = transferred;
                }
                d.speed_bps = 0;
                d.eta_seconds = 0;
                d.updated_at = Utc::now();
            })
            .await
        {
            Ok(Some(done)) => {
                info!(%id, file = %done.file_name, bytes = transferred, "download completed");
                self.notifier.completed(&done);
                let _ = self.event_tx.send(EngineEvent::Completed { download: done });
            }
            Ok(None) => {}
            Err(err) => warn!(%id, %err, "failed to persist completed download"),
        }
    }

    /// Cancellation is not a failure: the record keeps whatever was
    /// transferred, the partial file stays on disk, and no terminal event
    /// is emitted.
    async fn finish_paused(self) {
        let id = self.download.id;
        let transferred = self.download.bytes_transferred;
        match self
            .registry
            .update(id, |d| {
                if matches!(
                    d.status,
                    DownloadStatus::Pending | DownloadStatus::Downloading
                ) {
                    d.status = DownloadStatus::Paused;
                }
                d.bytes_transferred = transferred;
                d.speed_bps = 0;
                d.eta_seconds = 0;
            })
            .await
        {
            Ok(_) => info!(%id, bytes = transferred, "transfer cancelled"),
            Err(err) => warn!(%id, %err, "failed to persist paused download"),
        }
    }

    async fn finish_failed(self, err: EngineError) {
        let id = self.download.id;
        let reason = err.to_string();
        warn!(%id, %reason, "download failed");
        match self
            .registry
            .update(id, |d| {
                d.status = DownloadStatus::Failed;
                d.speed_bps = 0;
                d.eta_seconds = 0;
                d.updated_at = Utc::now();
            })
            .await
        {
            Ok(Some(failed)) => {
                self.notifier.failed(&failed, &reason);
                let _ = self.event_tx.send(EngineEvent::Failed {
                    download: failed,
                    reason,
                });
            }
            Ok(None) => {}
            Err(persist_err) => warn!(%id, %persist_err, "failed to persist failed download"),
        }
    }
}

fn percent(download: &Download) -> u8 {
    if download.total_size > 0 {
        ((download.bytes_transferred * 100) / download.total_size) as u8
    } else {
        0
    }
}
