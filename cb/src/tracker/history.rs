// Clipboard history persistence
// History is a newest-first JSON array of strings, rewritten whole on every change.

use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Newest-first list of clipboard snapshots
pub type HistoryList = Vec<String>;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("history file {path} is not a JSON array of strings: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write history file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Load the history file. Missing or blank files are an empty history.
pub fn load(path: &Path) -> Result<HistoryList, HistoryError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(HistoryError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&contents).map_err(|source| HistoryError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the history file, treating any failure as an empty history.
///
/// Keeps `list` and the daemon usable after the file was corrupted externally.
pub fn load_or_empty(path: &Path) -> HistoryList {
    match load(path) {
        Ok(list) => list,
        Err(err) => {
            tracing::warn!("Ignoring unreadable history: {}", err);
            Vec::new()
        }
    }
}

/// Rewrite the history file with `list` as pretty-printed JSON.
///
/// Readers only ever see the previous or the new complete file.
pub fn save(path: &Path, list: &[String]) -> Result<(), HistoryError> {
    let contents = serde_json::to_string_pretty(list)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| HistoryError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    atomic_write(path, &contents)
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
fn atomic_write(path: &Path, contents: &str) -> Result<(), HistoryError> {
    // Same directory keeps the rename on one filesystem
    let temp_path = path.with_file_name(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("history"),
        std::process::id()
    ));

    let result = write_locked(&temp_path, contents)
        .and_then(|()| fs::rename(&temp_path, path))
        .map_err(|source| HistoryError::Write {
            path: path.to_path_buf(),
            source,
        });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_locked(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    // Guards against a second writer racing on the same temp file
    file.lock_exclusive()?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    // Lock is released when file is dropped
    Ok(())
}

/// Prepend `entry` and truncate to `max` entries, leaving `list` untouched.
pub fn append(list: &[String], entry: String, max: usize) -> HistoryList {
    let mut next = Vec::with_capacity(list.len().saturating_add(1).min(max));
    next.push(entry);
    next.extend(list.iter().cloned());
    next.truncate(max);
    next
}
