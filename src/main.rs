//! CLI entry point for the downloader tool.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use downloader_core::{DownloadError, Downloader, DownloaderConfig};
use tracing::{debug, info, warn};

mod cli;
mod progress_ui;

use cli::Args;
use progress_ui::ProgressUi;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so --json output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = DownloaderConfig {
        workers: usize::from(args.workers),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        read_timeout: Duration::from_secs(args.read_timeout),
        ..DownloaderConfig::default()
    };
    let downloader = Downloader::new(config)?;

    info!(url = %args.url, output_dir = %args.output_dir.display(), "Downloader starting");
    let mut session = downloader.start(args.url.clone(), args.output_dir.clone());

    let cancel = session.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling download");
            cancel.cancel();
        }
    });

    let mut ui = ProgressUi::new(!args.quiet && !args.json);
    while let Some(event) = session.next_event().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        }
        ui.handle(&event);
    }

    match session.wait().await {
        Ok(path) => {
            info!(path = %path.display(), "Download complete");
            Ok(())
        }
        Err(DownloadError::Cancelled) => {
            info!("Download cancelled, partial files removed");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}
