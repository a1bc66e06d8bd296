//! CLI command implementations

use crate::output::{format_eta, format_speed, status_icon};
use crate::{progress, OutputFormat};
use anyhow::{anyhow, Result};
use console::style;
use streamsave_core::DownloadEngine;
use streamsave_types::{format_size, Download, DownloadStatus};
use uuid::Uuid;

/// Resolve a full id or a unique prefix against the registry.
async fn resolve_id(engine: &DownloadEngine, raw: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }

    let needle = raw.to_lowercase();
    let matches: Vec<Uuid> = engine
        .list()
        .await
        .iter()
        .map(|d| d.id)
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!("no download matches id '{raw}'")),
        _ => Err(anyhow!(
            "id '{raw}' is ambiguous ({} matches)",
            matches.len()
        )),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn add_download(
    engine: &DownloadEngine,
    url: &str,
    name: Option<&str>,
    mime: &str,
    subdir: Option<&str>,
    stream: bool,
    wait: bool,
    format: OutputFormat,
) -> Result<()> {
    let download = if stream {
        engine.start_streaming(url, name, mime).await?
    } else {
        engine.start(url, name, mime, subdir).await?
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&download)?),
        OutputFormat::Human => {
            println!(
                "{} Added download: {}",
                style("✓").green().bold(),
                style(&download.file_name).cyan()
            );
            println!("  ID: {}", download.id);
            println!("  Saving to: {}", download.file_path.display());
        }
    }

    if wait {
        progress::watch(engine, download.id).await?;
    }
    Ok(())
}

pub async fn list_downloads(
    engine: &DownloadEngine,
    show_all: bool,
    format: OutputFormat,
) -> Result<()> {
    let downloads = engine.list().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&downloads)?),
        OutputFormat::Human => {
            if downloads.is_empty() {
                println!("{}", style("No downloads found").dim());
                return Ok(());
            }

            for download in &downloads {
                print_download_summary(download, show_all);
            }
            println!();
            println!("{} download(s) total", style(downloads.len()).bold());
        }
    }

    Ok(())
}

pub async fn show_info(engine: &DownloadEngine, id: &str, format: OutputFormat) -> Result<()> {
    let id = resolve_id(engine, id).await?;
    let download = engine.get(id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&download)?),
        OutputFormat::Human => print_download_summary(&download, true),
    }

    Ok(())
}

pub async fn cancel_download(engine: &DownloadEngine, id: &str) -> Result<()> {
    let id = resolve_id(engine, id).await?;
    engine.cancel(id).await?;
    println!("{} Paused download {id}", style("⏸").yellow());
    Ok(())
}

pub async fn retry_download(
    engine: &DownloadEngine,
    id: &str,
    wait: bool,
    format: OutputFormat,
) -> Result<()> {
    let id = resolve_id(engine, id).await?;
    let download = engine.retry(id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&download)?),
        OutputFormat::Human => {
            println!(
                "{} Restarting download: {}",
                style("↻").cyan().bold(),
                style(&download.file_name).cyan()
            );
        }
    }

    if wait {
        progress::watch(engine, download.id).await?;
    }
    Ok(())
}

pub async fn delete_download(engine: &DownloadEngine, id: &str) -> Result<()> {
    let id = resolve_id(engine, id).await?;
    engine.delete(id).await?;
    println!("{} Deleted download {id}", style("✗").red());
    Ok(())
}

fn print_download_summary(download: &Download, detailed: bool) {
    let progress = if download.total_size > 0 {
        format!("{:.1}%", download.progress())
    } else {
        "?".to_string()
    };

    println!(
        "{} {} {} [{}]",
        status_icon(download.status),
        style(&download.file_name).bold(),
        style(&progress).dim(),
        style(format!("{:?}", download.status)).dim()
    );

    if detailed {
        println!("    ID: {}", download.id);
        println!("    URL: {}", download.url);
        println!("    Path: {}", download.file_path.display());
        println!(
            "    Size: {} / {}",
            format_size(download.bytes_transferred),
            if download.total_size > 0 {
                format_size(download.total_size)
            } else {
                "?".to_string()
            }
        );
        if download.status == DownloadStatus::Downloading {
            println!(
                "    Speed: {} (ETA {})",
                format_speed(download.speed_bps),
                format_eta(download.eta_seconds)
            );
        }
        println!("    Updated: {}", download.updated_at);
    }
}
