//! Helpers for tests that observe the sampler from the outside.
//!
//! All waiting happens on the tokio clock, so tests marked
//! `#[tokio::test(start_paused = true)]` run through long polling periods
//! without real sleeps.

use crate::tracker::history;
use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// Re-run `check` every `poll` until it succeeds; panic once `timeout` passes.
pub async fn assert_eventually<F, Fut, T, E>(
    what: &str,
    timeout: Duration,
    poll: Duration,
    mut check: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let last = match check().await {
            Ok(value) => return value,
            Err(err) => err,
        };

        if Instant::now() >= deadline {
            panic!(
                "{} did not happen within {:?} ({} attempts); last: {}",
                what, timeout, attempts, last
            );
        }
        tokio::time::sleep_until((Instant::now() + poll).min(deadline)).await;
    }
}

/// Wait until the history file on disk equals `expected`.
pub async fn history_eventually(path: &Path, expected: &[&str], timeout: Duration) {
    let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    assert_eventually(
        &format!("{} to hold {:?}", path.display(), expected),
        timeout,
        Duration::from_millis(100),
        || {
            let expected = expected.clone();
            async move {
                let list = history::load(path).map_err(|e| e.to_string())?;
                if list == expected {
                    Ok(())
                } else {
                    Err(format!("{:?}", list))
                }
            }
        },
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_success() {
        let calls = Cell::new(0);

        let value = assert_eventually(
            "third call",
            Duration::from_secs(5),
            Duration::from_millis(10),
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n >= 3 {
                        Ok(n)
                    } else {
                        Err("too early")
                    }
                }
            },
        )
        .await;

        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "never did not happen within")]
    async fn test_panics_after_timeout() {
        assert_eventually(
            "never",
            Duration::from_millis(300),
            Duration::from_millis(100),
            || async { Err::<(), _>("nope") },
        )
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_eventually_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        history::save(&path, &["b".to_string(), "a".to_string()]).unwrap();

        history_eventually(&path, &["b", "a"], Duration::from_secs(1)).await;
    }
}
