//! StreamSave CLI - save remote media files locally
//!
//! A command-line front end for the StreamSave download engine.

mod commands;
mod output;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// StreamSave - Media Download Engine
#[derive(Parser)]
#[command(name = "streamsave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Data directory for StreamSave
    #[arg(long, env = "STREAMSAVE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new download
    Add {
        /// URL to download
        url: String,

        /// File name to save as (derived from the URL when omitted)
        #[arg(short, long)]
        name: Option<String>,

        /// MIME type used to derive the file extension
        #[arg(short, long, default_value = "")]
        mime: String,

        /// Subdirectory under the download root
        #[arg(short, long)]
        subdir: Option<String>,

        /// Download into the streaming cache for playback while downloading
        #[arg(long)]
        stream: bool,

        /// Return immediately instead of watching the transfer
        #[arg(long)]
        no_wait: bool,
    },

    /// List downloads
    List {
        /// Show all details
        #[arg(short, long)]
        all: bool,
    },

    /// Show download info
    Info {
        /// Download ID (or unique prefix)
        id: String,
    },

    /// Cancel a download, leaving it paused
    Cancel {
        /// Download ID (or unique prefix)
        id: String,
    },

    /// Retry a paused or failed download from byte zero
    Retry {
        /// Download ID (or unique prefix)
        id: String,

        /// Return immediately instead of watching the transfer
        #[arg(long)]
        no_wait: bool,
    },

    /// Delete a download and its file
    Delete {
        /// Download ID (or unique prefix)
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .map(|d| d.join("streamsave"))
            .unwrap_or_else(|| PathBuf::from(".streamsave"))
    });

    let engine = streamsave_core::DownloadEngine::new(data_dir).await?;

    match cli.command {
        Commands::Add {
            url,
            name,
            mime,
            subdir,
            stream,
            no_wait,
        } => {
            commands::add_download(
                &engine,
                &url,
                name.as_deref(),
                &mime,
                subdir.as_deref(),
                stream,
                !no_wait,
                cli.output,
            )
            .await?
        }

        Commands::List { all } => commands::list_downloads(&engine, all, cli.output).await?,

        Commands::Info { id } => commands::show_info(&engine, &id, cli.output).await?,

        Commands::Cancel { id } => commands::cancel_download(&engine, &id).await?,

        Commands::Retry { id, no_wait } => {
            commands::retry_download(&engine, &id, !no_wait, cli.output).await?
        }

        Commands::Delete { id } => commands::delete_download(&engine, &id).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("streamsave=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
