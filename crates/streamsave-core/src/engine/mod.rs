//! Download engine internals: the façade, the per-download transfer
//! worker, and the progress estimator it samples from.

mod manager;
mod progress;
mod worker;

pub use manager::DownloadEngine;
pub use progress::ProgressEstimator;
