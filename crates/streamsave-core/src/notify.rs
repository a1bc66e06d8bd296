//! System-notification side channel.
//!
//! The engine reports transfer milestones to an injected [`Notifier`] so a
//! host platform can surface per-download notifications keyed by id. The
//! channel is advisory: implementations have no way to return an error and
//! must never panic, so notification behavior cannot affect a transfer.

use streamsave_types::Download;
use uuid::Uuid;

pub trait Notifier: Send + Sync {
    /// A transfer started or advanced; `percent` is 0 while the total size
    /// is unknown.
    fn progress(&self, _download: &Download, _percent: u8) {}

    fn completed(&self, _download: &Download) {}

    fn failed(&self, _download: &Download, _reason: &str) {}

    /// Remove any notification still shown for `id` (after a delete).
    fn clear(&self, _id: Uuid) {}
}

/// Default notifier for hosts without a notification surface.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}
