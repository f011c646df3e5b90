// OS process control for the tracker supervisor
// Spawning a detached daemon, signalling it, and probing whether a pid is alive.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Result of probing a pid with signal 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead,
    /// The process exists but belongs to someone else
    PermissionDenied,
}

impl Liveness {
    /// Whether a recorded pid should still be treated as the active instance
    pub fn is_live(self) -> bool {
        matches!(self, Liveness::Alive | Liveness::PermissionDenied)
    }
}

/// Why a termination signal could not be delivered
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalFailure {
    #[error("no process with pid {0}")]
    NotFound(u32),
    #[error("permission denied signalling pid {0}")]
    PermissionDenied(u32),
    #[error("failed to signal pid {pid}: {message}")]
    Other { pid: u32, message: String },
}

/// Capability interface over the OS process table
pub trait ProcessControl {
    /// Start `program` so that it outlives the caller, returning its pid.
    fn spawn_detached(&self, program: &Path, args: &[&OsStr]) -> io::Result<u32>;

    /// Send a termination request to `pid`.
    fn terminate(&self, pid: u32) -> Result<(), SignalFailure>;

    fn probe(&self, pid: u32) -> Liveness;
}

/// Real process control backed by `std::process` and `libc`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessControl;

#[cfg(unix)]
impl ProcessControl for OsProcessControl {
    fn spawn_detached(&self, program: &Path, args: &[&OsStr]) -> io::Result<u32> {
        use std::process::{Command, Stdio};

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        let child = command.spawn()?;
        // Dropping the handle does not kill the child; the daemon reparents to init.
        Ok(child.id())
    }

    fn terminate(&self, pid: u32) -> Result<(), SignalFailure> {
        let raw = to_raw_pid(pid).ok_or(SignalFailure::NotFound(pid))?;
        if unsafe { libc::kill(raw, libc::SIGTERM) } == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ESRCH) => Err(SignalFailure::NotFound(pid)),
            Some(libc::EPERM) => Err(SignalFailure::PermissionDenied(pid)),
            _ => Err(SignalFailure::Other {
                pid,
                message: err.to_string(),
            }),
        }
    }

    fn probe(&self, pid: u32) -> Liveness {
        let Some(raw) = to_raw_pid(pid) else {
            return Liveness::Dead;
        };
        if unsafe { libc::kill(raw, 0) } == 0 {
            return Liveness::Alive;
        }

        match io::Error::last_os_error().raw_os_error() {
            Some(libc::EPERM) => Liveness::PermissionDenied,
            _ => Liveness::Dead,
        }
    }
}

// TODO(windows): spawn with DETACHED_PROCESS and terminate via TerminateProcess
#[cfg(not(unix))]
impl ProcessControl for OsProcessControl {
    fn spawn_detached(&self, program: &Path, args: &[&OsStr]) -> io::Result<u32> {
        use std::process::{Command, Stdio};

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(child.id())
    }

    fn terminate(&self, pid: u32) -> Result<(), SignalFailure> {
        Err(SignalFailure::Other {
            pid,
            message: "process signalling is only supported on unix".to_string(),
        })
    }

    fn probe(&self, _pid: u32) -> Liveness {
        // Conservative fallback: trust the PID file
        Liveness::Alive
    }
}

/// Run the child in a new session: no controlling terminal, and it survives
/// the exit of the `cb` invocation that spawned it.
#[cfg(unix)]
pub fn detach(command: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;

    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn detach(_command: &mut std::process::Command) {}

/// Reject pids that would address a process group (0, or overflow to negative).
#[cfg(unix)]
fn to_raw_pid(pid: u32) -> Option<libc::pid_t> {
    libc::pid_t::try_from(pid).ok().filter(|raw| *raw > 0)
}
