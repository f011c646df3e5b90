// Start-on-boot registration
// Renders a systemd user unit that runs `cb tracker start` and enables it.
// Best-effort: only systemd user sessions are supported.

use crate::cli_paths::find_on_path;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

pub const UNIT_NAME: &str = "cb-tracker.service";

/// Restart budget: at most RESTART_BURST restarts within RESTART_INTERVAL_SECS
const RESTART_BURST: u32 = 5;
const RESTART_INTERVAL_SECS: u32 = 500;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("boot registration needs systemd (`systemctl` was not found on PATH)")]
    Unsupported,
    #[error("could not determine the user configuration directory")]
    NoConfigDir,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to run systemctl: {0}")]
    Systemctl(std::io::Error),
    #[error("`systemctl --user enable cb-tracker.service` exited with {0}")]
    EnableFailed(std::process::ExitStatus),
}

/// Render the unit file for the `cb` binary at `cli_path`.
pub fn render_unit(cli_path: &Path) -> String {
    let cli = cli_path.display();
    format!(
        r#"# Generated by `cb tracker enable-boot`
[Unit]
Description=cb clipboard history tracker
After=graphical-session.target
StartLimitIntervalSec={interval}
StartLimitBurst={burst}

[Service]
Type=forking
ExecStart={cli} tracker start
ExecStop={cli} tracker stop
Restart=on-failure

[Install]
WantedBy=default.target
"#,
        cli = cli,
        interval = RESTART_INTERVAL_SECS,
        burst = RESTART_BURST,
    )
}

/// `$XDG_CONFIG_HOME/systemd/user`, defaulting to `~/.config/systemd/user`
pub fn user_unit_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("systemd").join("user"))
}

/// Write the unit into `unit_dir`, returning the unit path.
pub fn install_unit(unit_dir: &Path, cli_path: &Path) -> Result<PathBuf, BootError> {
    fs::create_dir_all(unit_dir).map_err(|source| BootError::Write {
        path: unit_dir.to_path_buf(),
        source,
    })?;

    let unit_path = unit_dir.join(UNIT_NAME);
    fs::write(&unit_path, render_unit(cli_path)).map_err(|source| BootError::Write {
        path: unit_path.clone(),
        source,
    })?;

    Ok(unit_path)
}

/// Install the unit for the current user and enable it with systemctl.
pub fn enable(cli_path: &Path) -> Result<PathBuf, BootError> {
    let systemctl = find_on_path("systemctl").ok_or(BootError::Unsupported)?;
    let unit_dir = user_unit_dir().ok_or(BootError::NoConfigDir)?;
    let unit_path = install_unit(&unit_dir, cli_path)?;
    tracing::info!("Wrote {}", unit_path.display());

    let status = Command::new(&systemctl)
        .args(["--user", "daemon-reload"])
        .status()
        .map_err(BootError::Systemctl)?;
    if !status.success() {
        tracing::warn!("systemctl --user daemon-reload exited with {}", status);
    }

    let status = Command::new(&systemctl)
        .args(["--user", "enable", UNIT_NAME])
        .status()
        .map_err(BootError::Systemctl)?;
    if !status.success() {
        return Err(BootError::EnableFailed(status));
    }

    tracing::info!("Enabled {} for user session", UNIT_NAME);
    Ok(unit_path)
}
