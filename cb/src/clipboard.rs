// System clipboard access
// The tracker reads through `ClipboardSource`, the history browser writes through `ClipboardSink`.

use crate::tracker::process::detach;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Synchronous clipboard read primitive
pub trait ClipboardSource {
    /// Current text content, or `None` when the clipboard holds no text.
    fn read_text(&mut self) -> Result<Option<String>>;
}

/// Synchronous clipboard write primitive
pub trait ClipboardSink {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

impl<T: ClipboardSink + ?Sized> ClipboardSink for Box<T> {
    fn write_text(&mut self, text: &str) -> Result<()> {
        (**self).write_text(text)
    }
}

/// Clipboard backed by `arboard`
///
/// The connection is opened lazily and dropped after a failure so a clipboard
/// owner that restarts (e.g. the X server or compositor) is picked up again.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard> {
        if self.inner.is_none() {
            let clipboard = arboard::Clipboard::new().context("Failed to open system clipboard")?;
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .context("System clipboard is unavailable")
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Result<Option<String>> {
        let result = self.handle()?.get_text();
        match result {
            Ok(text) => Ok(Some(text)),
            // Images or an empty selection are not an error for history purposes
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => {
                self.inner = None;
                Err(err).context("Failed to read clipboard")
            }
        }
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let result = self.handle()?.set_text(text.to_owned());
        result.map_err(|err| {
            self.inner = None;
            anyhow::Error::new(err).context("Failed to write clipboard")
        })
    }
}

/// Sink that hands the text to a detached helper process over stdin.
///
/// X11 and Wayland selections are served by the owning process, so text set
/// by a short-lived `cb` would vanish when it exits. The helper keeps serving
/// it until another application takes the selection over.
pub struct HandoffClipboard {
    program: PathBuf,
    args: Vec<OsString>,
}

impl HandoffClipboard {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `cb-tracker --serve-clipboard`, logging into `logs_path`
    pub fn via_tracker(tracker_bin: &Path, logs_path: &Path) -> Self {
        Self::new(
            tracker_bin,
            vec![
                OsString::from("--serve-clipboard"),
                OsString::from("--logs-path"),
                logs_path.as_os_str().to_owned(),
            ],
        )
    }
}

impl ClipboardSink for HandoffClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        let mut child = command.spawn().with_context(|| {
            format!(
                "Failed to start clipboard helper {}",
                self.program.display()
            )
        })?;
        let mut stdin = child.stdin.take().context("Clipboard helper has no stdin")?;
        stdin
            .write_all(text.as_bytes())
            .context("Failed to send text to clipboard helper")?;
        // Closing stdin tells the helper the text is complete
        drop(stdin);

        tracing::info!("Clipboard helper {} is serving the selection", child.id());
        Ok(())
    }
}

/// Own the clipboard with `text` until another application replaces it.
///
/// Blocks for as long as the selection is ours on Linux.
#[cfg(target_os = "linux")]
pub fn serve_text(text: String) -> Result<()> {
    use arboard::SetExtLinux;

    let mut clipboard = arboard::Clipboard::new().context("Failed to open system clipboard")?;
    clipboard
        .set()
        .wait()
        .text(text)
        .context("Failed to serve clipboard text")
}

/// Other platforms keep clipboard contents after the writer exits.
#[cfg(not(target_os = "linux"))]
pub fn serve_text(text: String) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Failed to open system clipboard")?;
    clipboard
        .set_text(text)
        .context("Failed to write clipboard")
}
