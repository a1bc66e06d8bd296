//! Shared types for StreamSave
//!
//! This crate contains the data structures shared between the download
//! engine and its front ends (CLI, UI integrations).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

// ============================================================================
// Download Types
// ============================================================================

/// Observable state of a single download.
///
/// One record exists per download id from `start` until an explicit delete.
/// `speed_bps` and `eta_seconds` are runtime-only: they are recomputed while
/// a transfer is active and are zero otherwise, so they are not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: Uuid,
    pub file_name: String,
    pub url: String,
    pub file_path: PathBuf,
    /// Total size in bytes; 0 until the server reports a content length.
    pub total_size: u64,
    pub bytes_transferred: u64,
    pub status: DownloadStatus,
    pub mime_type: String,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub speed_bps: u64,
    #[serde(skip)]
    pub eta_seconds: u64,
}

impl Download {
    pub fn new(file_name: String, url: String, file_path: PathBuf, mime_type: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name,
            url,
            file_path,
            total_size: 0,
            bytes_transferred: 0,
            status: DownloadStatus::Pending,
            mime_type,
            updated_at: Utc::now(),
            speed_bps: 0,
            eta_seconds: 0,
        }
    }

    /// Progress in percent, 0.0 while the total size is unknown.
    pub fn progress(&self) -> f64 {
        if self.total_size > 0 {
            (self.bytes_transferred as f64 / self.total_size as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Status of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Paused,
}

impl DownloadStatus {
    /// Whether `retry` may take this download back to `Pending`.
    pub fn is_retryable(self) -> bool {
        matches!(self, DownloadStatus::Paused | DownloadStatus::Failed)
    }
}

// ============================================================================
// Event Types
// ============================================================================

/// Events broadcast by the engine to every subscriber.
///
/// Cancellation deliberately emits nothing: a paused download is neither a
/// completion nor a failure, and observers pick the change up from the
/// registry on their next refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    Progress { download: Download },
    Completed { download: Download },
    Failed { download: Download, reason: String },
}

// ============================================================================
// Formatting
// ============================================================================

/// Format a byte count for display: whole B/KB, one decimal MB, two decimal GB.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{} KB", bytes / KB)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}
