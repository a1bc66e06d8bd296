//! Output formatting utilities

use console::{style, StyledObject};
use streamsave_types::{format_size, DownloadStatus};

/// Format speed as human-readable
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_size(bytes_per_sec))
}

/// Format an ETA in seconds as human-readable
pub fn format_eta(seconds: u64) -> String {
    if seconds == 0 {
        return "—".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

pub fn status_icon(status: DownloadStatus) -> StyledObject<&'static str> {
    match status {
        DownloadStatus::Completed => style("✓").green(),
        DownloadStatus::Downloading => style("↓").cyan(),
        DownloadStatus::Paused => style("⏸").yellow(),
        DownloadStatus::Failed => style("✗").red(),
        DownloadStatus::Pending => style("·").dim(),
    }
}
