// Clipboard sampler
// Runs inside the detached `cb-tracker` process: polls the clipboard on a fixed
// period and rewrites the history file whenever the content changes.

use crate::clipboard::ClipboardSource;
use crate::config::TrackerConfig;
use crate::tracker::history::{self, HistoryList};
use regex::Regex;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::LazyLock;
use tokio::time::MissedTickBehavior;

/// Characters of clipboard content included in log lines
const PREVIEW_CHARS: usize = 100;

static WHITESPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clipboard empty or identical to the last observation
    Unchanged,
    /// A new entry was prepended; `persisted` is false when the file write failed
    Recorded { persisted: bool },
}

pub struct Sampler<S> {
    source: S,
    history_file: PathBuf,
    max_clip_history: usize,
    normalize_whitespace: bool,
    history: HistoryList,
    last_observed: Option<String>,
}

impl<S: ClipboardSource> Sampler<S> {
    /// Create a sampler continuing from the history already on disk.
    pub fn new(config: &TrackerConfig, source: S) -> Self {
        let history = history::load_or_empty(&config.history_file);
        Self::with_history(config, source, history)
    }

    pub fn with_history(config: &TrackerConfig, source: S, mut history: HistoryList) -> Self {
        history.truncate(config.max_clip_history);
        Self {
            source,
            history_file: config.history_file.clone(),
            max_clip_history: config.max_clip_history,
            normalize_whitespace: config.normalize_whitespace,
            history,
            last_observed: None,
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Record the clipboard content present at startup without adding it.
    ///
    /// A restart then does not duplicate whatever was last copied.
    pub fn seed(&mut self) {
        self.last_observed = self.read_clipboard();
    }

    /// Sample the clipboard once.
    pub fn tick(&mut self) -> TickOutcome {
        let current = self.read_clipboard();

        let changed = match current.as_deref() {
            Some(text) if !text.is_empty() => self.last_observed.as_deref() != Some(text),
            _ => false,
        };

        let outcome = match current.as_deref() {
            Some(text) if changed => {
                tracing::info!("Clipboard updated: {}...", preview(text));
                let entry = self.normalize(text);
                self.history = history::append(&self.history, entry, self.max_clip_history);
                TickOutcome::Recorded {
                    persisted: self.persist(),
                }
            }
            _ => TickOutcome::Unchanged,
        };

        self.last_observed = current;
        outcome
    }

    /// Tick forever on `period`. Panics inside a tick are logged and sampling
    /// continues with the next tick.
    pub async fn run(mut self, period: std::time::Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "Tracking clipboard every {:?} into {}",
            period,
            self.history_file.display()
        );

        loop {
            interval.tick().await;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
                tracing::error!("Uncaught panic in sampler tick: {}", panic_message(&*payload));
            }
        }
    }

    fn read_clipboard(&mut self) -> Option<String> {
        match self.source.read_text() {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!("Clipboard read failed: {:#}", err);
                None
            }
        }
    }

    fn persist(&self) -> bool {
        match history::save(&self.history_file, &self.history) {
            Ok(()) => {
                tracing::info!("Updated clipboard history file.");
                true
            }
            Err(err) => {
                tracing::error!("Failed to write to history file. Error: {}", err);
                false
            }
        }
    }

    fn normalize(&self, text: &str) -> String {
        if self.normalize_whitespace {
            WHITESPACE_RUN_RE
                .replace_all(&text.replace('\n', ""), " ")
                .into_owned()
        } else {
            text.to_string()
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
