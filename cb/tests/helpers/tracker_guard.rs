//! Cleanup for tracker processes started by integration tests.

use super::polling::wait_until;
use std::time::Duration;

/// Kills the tracker on drop if a test bailed out before stopping it.
pub struct TrackerGuard {
    pid: Option<u32>,
}

impl TrackerGuard {
    pub fn new(pid: u32) -> Self {
        Self { pid: Some(pid) }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The test stopped the tracker itself; nothing left to clean up.
    pub fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        let Some(pid) = self.pid.take() else {
            return;
        };
        if !is_process_running(pid) {
            return;
        }

        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGKILL);
        }
        if !wait_for_process_exit(pid, Duration::from_secs(2)) {
            eprintln!("Failed to terminate cb-tracker pid {}", pid);
        }
    }
}

/// Wait for `pid` to exit, reaping it if it is our own child.
pub fn wait_for_process_exit(pid: u32, timeout: Duration) -> bool {
    wait_until(&format!("pid {} to exit", pid), timeout, || {
        reap(pid);
        if is_process_running(pid) {
            Err(Some("still running".to_string()))
        } else {
            Ok(())
        }
    })
    .is_ok()
}

pub fn is_process_running(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// Collect the exit status of a child so it does not linger as a zombie.
fn reap(pid: u32) {
    let mut status = 0;
    unsafe {
        libc::waitpid(pid as libc::pid_t, &mut status, libc::WNOHANG);
    }
}
