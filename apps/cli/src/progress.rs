//! Progress bar rendering for in-flight downloads

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use streamsave_core::DownloadEngine;
use streamsave_types::EngineEvent;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

/// Render a progress bar for one download until it completes or fails.
///
/// The bar is fed entirely from the engine's event channel; cancellation
/// from another surface simply stops the events, so the caller is expected
/// to interrupt with Ctrl-C in that case.
pub async fn watch(engine: &DownloadEngine, id: Uuid) -> Result<()> {
    let mut rx = engine.subscribe();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}")
            .unwrap()
            .progress_chars("█▓▒░  "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    if let Ok(download) = engine.get(id).await {
        bar.set_message(download.file_name.clone());
        bar.set_length(download.total_size);
        bar.set_position(download.bytes_transferred);
    }

    loop {
        match rx.recv().await {
            Ok(EngineEvent::Progress { download }) if download.id == id => {
                bar.set_length(download.total_size);
                bar.set_position(download.bytes_transferred);
            }
            Ok(EngineEvent::Completed { download }) if download.id == id => {
                bar.set_length(download.total_size);
                bar.set_position(download.bytes_transferred);
                bar.finish_with_message(format!("{} complete", style("✓").green().bold()));
                return Ok(());
            }
            Ok(EngineEvent::Failed { download, reason }) if download.id == id => {
                bar.abandon_with_message(format!("{} {reason}", style("✗").red().bold()));
                return Err(anyhow::anyhow!("download failed: {reason}"));
            }
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
