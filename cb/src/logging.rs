//! Tracing setup for the `cb` CLI and the `cb-tracker` daemon
//!
//! Both processes log to files under `logsPath`:
//!
//! - `app.log`: foreground `cb` invocations (plus stderr with `--verbose`)
//! - `tracker.log`: the detached sampler
//!
//! Lines look like `2024-05-01 10:30:45 INFO Clipboard updated: ...`.
//! `RUST_LOG` overrides the default `info` filter.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

pub const APP_LOG: &str = "app.log";
pub const TRACKER_LOG: &str = "tracker.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn timer() -> fmt::time::ChronoLocal {
    fmt::time::ChronoLocal::new(TIMESTAMP_FORMAT.to_string())
}

/// Initialize logging for a foreground `cb` invocation.
pub fn init_cli(logs_path: &Path, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(logs_path)
        .with_context(|| format!("Failed to create logs directory {}", logs_path.display()))?;

    let file_layer = fmt::layer()
        .with_timer(timer())
        .with_target(false)
        .with_ansi(false)
        .with_writer(tracing_appender::rolling::never(logs_path, APP_LOG));

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_timer(timer())
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    registry()
        .with(env_filter())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Initialize logging for the detached tracker process.
pub fn init_daemon(logs_path: &Path) -> Result<()> {
    std::fs::create_dir_all(logs_path)
        .with_context(|| format!("Failed to create logs directory {}", logs_path.display()))?;

    let file_layer = fmt::layer()
        .with_timer(timer())
        .with_target(false)
        .with_ansi(false)
        .with_writer(tracing_appender::rolling::never(logs_path, TRACKER_LOG));

    registry()
        .with(env_filter())
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    install_panic_hook();
    Ok(())
}

/// Route panics through tracing so they land in the log file.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = crate::tracker::sampler::panic_message(info.payload());
        tracing::error!("Uncaught panic at {}: {}", location, message);
    }));
}
