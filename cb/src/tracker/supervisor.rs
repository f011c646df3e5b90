// Tracker supervisor
// Starts, stops, restarts and queries the detached `cb-tracker` process.
// Coordination with the daemon happens only through the PID file.

use crate::config::TrackerConfig;
use crate::tracker::lock::{LockError, ProcessLock};
use crate::tracker::process::{ProcessControl, SignalFailure};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("failed to encode tracker config: {0}")]
    EncodeConfig(#[from] serde_json::Error),
    #[error("could not find the cb-tracker binary; install it next to cb or set CB_TRACKER_BIN")]
    TrackerNotFound,
    #[error("failed to start tracker {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("no editor configured")]
    NoEditor,
    #[error("failed to launch editor `{editor}`: {source}")]
    Editor {
        editor: String,
        source: std::io::Error,
    },
    #[error("editor `{editor}` exited with {status}")]
    EditorFailed { editor: String, status: ExitStatus },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started {
        pid: u32,
        /// Pid of a dead instance whose record was replaced
        replaced_stale: Option<u32>,
    },
    AlreadyRunning {
        pid: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped {
        pid: u32,
    },
    SignalFailed {
        pid: u32,
        failure: SignalFailure,
        lock_cleared: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerStatus {
    Running { pid: u32 },
    /// The PID file names a process that no longer exists
    Stale { pid: u32 },
    NotRunning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartOutcome {
    pub stop: StopOutcome,
    pub start: StartOutcome,
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOutcome::Started { .. } => write!(f, "Started tracking clipboard in background."),
            StartOutcome::AlreadyRunning { pid } => write!(
                f,
                "Process with id {} is already running. \nTry running `cb tracker stop` or `cb tracker restart` instead.",
                pid
            ),
        }
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::NotRunning => write!(f, "No process is running."),
            StopOutcome::Stopped { .. } => write!(f, "Stopped tracking clipboard."),
            StopOutcome::SignalFailed {
                failure,
                lock_cleared: true,
                ..
            } => write!(
                f,
                "Can't stop tracking clipboard, no process found ({}). Cleared the stale PID file.",
                failure
            ),
            StopOutcome::SignalFailed {
                failure,
                lock_cleared: false,
                ..
            } => write!(f, "Can't stop tracking clipboard: {}.", failure),
        }
    }
}

impl fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerStatus::Running { pid } => {
                write!(f, "Tracker is running with process id {}.", pid)
            }
            TrackerStatus::Stale { pid } => write!(
                f,
                "No process is running (PID file names exited process {}).",
                pid
            ),
            TrackerStatus::NotRunning => write!(f, "No process is running."),
        }
    }
}

impl StopOutcome {
    /// Whether the outcome should be reported on stderr
    pub fn is_failure(&self) -> bool {
        matches!(self, StopOutcome::SignalFailed { .. })
    }
}

/// Supervisor for the tracker daemon
///
/// The PID-file check-then-write in `start` is not atomic: two concurrent
/// `start` invocations can both spawn. Serialize `tracker` subcommands when
/// scripting them.
pub struct Supervisor<P> {
    config: TrackerConfig,
    lock: ProcessLock,
    process: P,
    /// Only `start` needs the daemon binary
    tracker_bin: Option<PathBuf>,
}

impl<P: ProcessControl> Supervisor<P> {
    pub fn new(config: TrackerConfig, process: P, tracker_bin: Option<PathBuf>) -> Self {
        let lock = ProcessLock::new(config.pid_file());
        Self {
            config,
            lock,
            process,
            tracker_bin,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn lock(&self) -> &ProcessLock {
        &self.lock
    }

    /// Spawn the tracker unless a live instance is already recorded.
    ///
    /// Never waits on the child; the caller is expected to exit afterwards.
    pub fn start(&self) -> Result<StartOutcome, SupervisorError> {
        self.lock.ensure_exists()?;

        let mut replaced_stale = None;
        if let Some(pid) = self.lock.acquire()? {
            let liveness = self.process.probe(pid);
            if liveness.is_live() {
                tracing::info!("Tracker already running with pid {}", pid);
                return Ok(StartOutcome::AlreadyRunning { pid });
            }
            tracing::warn!("PID file names exited process {}; replacing it", pid);
            replaced_stale = Some(pid);
        }

        let program = self.tracker_program()?;
        let config_json = serde_json::to_string(&self.config)?;
        let args: [&OsStr; 2] = [OsStr::new("--config"), OsStr::new(&config_json)];
        let pid = self
            .process
            .spawn_detached(program, &args)
            .map_err(|source| SupervisorError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        if let Err(err) = self.lock.record(pid) {
            // An unrecorded tracker would be invisible to stop and status
            tracing::error!("Failed to record tracker pid {}: {}; terminating it", pid, err);
            if let Err(failure) = self.process.terminate(pid) {
                tracing::warn!("Failed to terminate unrecorded tracker: {}", failure);
            }
            return Err(err.into());
        }
        tracing::info!("Started tracker {} with pid {}", program.display(), pid);

        Ok(StartOutcome::Started {
            pid,
            replaced_stale,
        })
    }

    /// Signal the recorded tracker and clear the PID file.
    ///
    /// The file is kept only when the process exists but may not be signalled
    /// by us; any other failure means the record is stale and it is cleared.
    pub fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let Some(pid) = self.lock.acquire()? else {
            tracing::info!("Stop requested but no tracker is recorded");
            return Ok(StopOutcome::NotRunning);
        };

        match self.process.terminate(pid) {
            Ok(()) => {
                self.lock.clear()?;
                tracing::info!("Stopped tracker with pid {}", pid);
                Ok(StopOutcome::Stopped { pid })
            }
            Err(failure @ SignalFailure::PermissionDenied(_)) => {
                tracing::error!("Failed to stop tracker: {}", failure);
                Ok(StopOutcome::SignalFailed {
                    pid,
                    failure,
                    lock_cleared: false,
                })
            }
            Err(failure) => {
                tracing::error!("Failed to stop tracker: {}; clearing PID file", failure);
                self.lock.clear()?;
                Ok(StopOutcome::SignalFailed {
                    pid,
                    failure,
                    lock_cleared: true,
                })
            }
        }
    }

    /// Stop then start. Refuses up front when the daemon binary is missing,
    /// so a running tracker is not stopped without a replacement.
    pub fn restart(&self) -> Result<RestartOutcome, SupervisorError> {
        self.tracker_program()?;
        let stop = self.stop()?;
        let start = self.start()?;
        Ok(RestartOutcome { stop, start })
    }

    fn tracker_program(&self) -> Result<&Path, SupervisorError> {
        self.tracker_bin
            .as_deref()
            .ok_or(SupervisorError::TrackerNotFound)
    }

    /// Read-only view of the PID file.
    pub fn status(&self) -> Result<TrackerStatus, SupervisorError> {
        let status = match self.lock.acquire()? {
            None => TrackerStatus::NotRunning,
            Some(pid) if self.process.probe(pid).is_live() => TrackerStatus::Running { pid },
            Some(pid) => TrackerStatus::Stale { pid },
        };
        Ok(status)
    }

    /// Open the history file in the configured editor and wait for it to exit.
    pub fn open(&self) -> Result<(), SupervisorError> {
        let mut parts = self.config.editor.split_whitespace();
        let program = parts.next().ok_or(SupervisorError::NoEditor)?;

        tracing::info!(
            "Opening {} with {}",
            self.config.history_file.display(),
            self.config.editor
        );

        let status = Command::new(program)
            .args(parts)
            .arg(&self.config.history_file)
            .status()
            .map_err(|source| SupervisorError::Editor {
                editor: self.config.editor.clone(),
                source,
            })?;

        if !status.success() {
            return Err(SupervisorError::EditorFailed {
                editor: self.config.editor.clone(),
                status,
            });
        }
        Ok(())
    }
}
