// cb-tracker: Background clipboard history sampler
//
// Spawned detached by `cb tracker start`, which passes the resolved
// configuration as JSON and records our PID. Runs until signalled.
//
// Responsibilities:
// - Poll the system clipboard every `pollIntervalMs`
// - Prepend new content to the history file, bounded by `maxClipHistory`
// - Log activity to `<logsPath>/tracker.log`
//
// `cb-tracker --serve-clipboard` is a second, short-lived mode used by
// `cb tracker list`: it reads text from stdin and keeps the selection alive
// after `cb` exits, until another application takes the clipboard.

use anyhow::{Context, Result};
use cb_lib::{
    clipboard::{self, SystemClipboard},
    config::TrackerConfig,
    logging,
    tracker::sampler::Sampler,
};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;

#[derive(Debug, Parser)]
#[command(name = "cb-tracker", version, about = "Clipboard history sampler")]
struct Args {
    /// Resolved tracker configuration as JSON
    #[arg(long, required_unless_present = "serve_clipboard")]
    config: Option<String>,

    /// Serve text read from stdin as the clipboard selection, then exit
    #[arg(long, conflicts_with = "config")]
    serve_clipboard: bool,

    /// Log directory for --serve-clipboard
    #[arg(long, requires = "serve_clipboard")]
    logs_path: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.serve_clipboard {
        return serve_clipboard(args.logs_path).await;
    }

    let config_json = args.config.context("--config is required")?;
    let config: TrackerConfig =
        serde_json::from_str(&config_json).context("Failed to parse --config JSON")?;
    config.validate()?;

    logging::init_daemon(&config.logs_path)?;
    tracing::info!("Tracker starting with pid {}", std::process::id());

    let mut sampler = Sampler::new(&config, SystemClipboard::new());
    sampler.seed();

    tokio::select! {
        _ = sampler.run(config.poll_interval()) => {}
        _ = shutdown_signal() => {
            tracing::info!("Tracker received shutdown signal, exiting");
        }
    }

    Ok(())
}

async fn serve_clipboard(logs_path: Option<PathBuf>) -> Result<()> {
    if let Some(logs_path) = logs_path {
        logging::init_daemon(&logs_path)?;
    }

    let text = std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?;
    tracing::info!(
        "Serving {} characters on the clipboard",
        text.chars().count()
    );

    tokio::task::spawn_blocking(move || clipboard::serve_text(text))
        .await
        .context("Clipboard helper task failed")??;

    tracing::info!("Clipboard selection taken over by another application");
    Ok(())
}

/// Resolves on SIGTERM (sent by `cb tracker stop`) or SIGINT.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};
        match unix_signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = signal::ctrl_c() => {}
                }
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                let _ = signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
