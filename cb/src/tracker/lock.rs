// PID-file lock naming the active tracker daemon
// The file is either empty (no active instance) or holds a decimal process id.
// Every call re-reads the file; nothing is cached between operations.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to create lock directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to read PID file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write PID file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Handle on the tracker PID file
#[derive(Debug, Clone)]
pub struct ProcessLock {
    path: PathBuf,
}

impl ProcessLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the containing directory and an empty PID file if absent.
    pub fn ensure_exists(&self) -> Result<(), LockError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| LockError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        // create_new makes this idempotent without clobbering a recorded pid
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(LockError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Read the recorded pid.
    ///
    /// Returns `None` when the file is missing, empty, or not a number: all of
    /// these mean "no active instance".
    pub fn acquire(&self) -> Result<Option<u32>, LockError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(parse_pid(&contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LockError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Overwrite the file with `pid`.
    pub fn record(&self, pid: u32) -> Result<(), LockError> {
        self.write(&pid.to_string())
    }

    /// Overwrite the file with an empty string.
    pub fn clear(&self) -> Result<(), LockError> {
        self.write("")
    }

    fn write(&self, contents: &str) -> Result<(), LockError> {
        fs::write(&self.path, contents).map_err(|source| LockError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn parse_pid(contents: &str) -> Option<u32> {
    contents.trim().parse::<u32>().ok().filter(|pid| *pid > 0)
}
