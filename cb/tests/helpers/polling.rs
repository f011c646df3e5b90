use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const INITIAL_DELAY_MS: u64 = 25;
const MAX_DELAY_MS: u64 = 500;

/// Timed out waiting for a condition to hold.
#[derive(Debug)]
pub struct WaitError {
    what: String,
    attempts: u32,
    waited: Duration,
    last_observed: Option<String>,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timed out after {} attempts over {:?} waiting for {}. Last observed: {}",
            self.attempts,
            self.waited,
            self.what,
            self.last_observed
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("<nothing>")
        )
    }
}

impl std::error::Error for WaitError {}

/// Poll `check` with exponential backoff until it yields `Ok`.
///
/// `Err(observation)` means "not yet"; the last observation is kept for the
/// timeout message.
pub fn wait_until<T, F>(what: &str, timeout: Duration, mut check: F) -> Result<T, WaitError>
where
    F: FnMut() -> Result<T, Option<String>>,
{
    let start = Instant::now();
    let mut delay = Duration::from_millis(INITIAL_DELAY_MS);
    let mut attempts = 0;
    let mut last_observed = None;

    loop {
        attempts += 1;
        match check() {
            Ok(value) => return Ok(value),
            Err(observed) => {
                if observed.is_some() {
                    last_observed = observed;
                }
            }
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return Err(WaitError {
                what: what.to_string(),
                attempts,
                waited: start.elapsed(),
                last_observed,
            });
        }

        thread::sleep(delay.min(remaining));
        delay = (delay * 2).min(Duration::from_millis(MAX_DELAY_MS));
    }
}

/// Poll a file until its content satisfies `predicate`.
pub fn wait_for_file_content<P, F>(
    path: P,
    predicate: F,
    timeout: Duration,
) -> Result<String, WaitError>
where
    P: AsRef<Path>,
    F: Fn(&str) -> bool,
{
    let path: PathBuf = path.as_ref().to_path_buf();
    wait_until(&path.display().to_string(), timeout, || {
        match fs::read_to_string(&path) {
            Ok(content) if predicate(&content) => Ok(content),
            Ok(content) => Err(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(None),
            Err(err) => Err(Some(format!("read error: {}", err))),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pid_file_already_written() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("tracker.pid");
        fs::write(&file, "4242").unwrap();

        let content = wait_for_file_content(
            &file,
            |text| text.trim().parse::<u32>().is_ok(),
            Duration::from_secs(1),
        )
        .expect("should read file immediately");
        assert_eq!(content, "4242");
    }

    #[test]
    fn test_timeout_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("missing.json");

        let err = wait_for_file_content(&file, |_| true, Duration::from_millis(1)).unwrap_err();
        assert!(err.to_string().contains("missing.json"), "{}", err);
    }
}
