// CLI paths
// Locates the `cb` and `cb-tracker` binaries for spawning and boot registration.

use std::path::{Path, PathBuf};

/// Environment variable pointing directly at the tracker binary
pub const TRACKER_BIN_ENV: &str = "CB_TRACKER_BIN";

pub fn tracker_binary_name() -> &'static str {
    if cfg!(windows) {
        "cb-tracker.exe"
    } else {
        "cb-tracker"
    }
}

/// Resolve the tracker daemon binary.
///
/// Strategies, in order:
/// 1. `$CB_TRACKER_BIN`
/// 2. Next to the current executable (the usual `cargo install` layout)
/// 3. Anywhere on `PATH`
pub fn resolve_tracker_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(TRACKER_BIN_ENV) {
        let candidate = PathBuf::from(path);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(tracker_binary_name());
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    find_on_path(tracker_binary_name())
}

/// Absolute path of the running `cb` binary, used by the boot unit.
pub fn resolve_cli_path() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.canonicalize().or(Ok(exe))
}

/// Search each `PATH` entry for an executable file named `name`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
