//! StreamSave Core - Download Engine
//!
//! A concurrent, restart-from-zero download engine: per-item lifecycle
//! tracking, live throughput/ETA, a registry persisted in full after every
//! mutation, and cancel/retry/delete/stream-while-downloading semantics.

mod engine;
mod error;
mod layout;
mod namer;
mod notify;
mod registry;

pub use engine::{DownloadEngine, ProgressEstimator};
pub use error::EngineError;
pub use layout::{StorageLayout, APP_DIR_NAME};
pub use namer::{resolve_file_name, sanitize_component, FALLBACK_EXTENSION};
pub use notify::{Notifier, NoopNotifier};
pub use registry::Registry;

pub use streamsave_types::{format_size, Download, DownloadStatus, EngineEvent};
