// Interactive history browser
// Pages through the history newest-first and copies a chosen entry to the clipboard.

use crate::clipboard::ClipboardSink;
use crossterm::style::Stylize;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Consecutive invalid answers tolerated before giving up
pub const MAX_INVALID_INPUTS: usize = 5;

const MIN_PAGE_SIZE: usize = 10;
const PAGE_ROW_FRACTION: f64 = 0.85;
const FALLBACK_TERMINAL: (u16, u16) = (80, 24);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("input closed before a choice was made")]
    InputClosed,
    #[error("gave up after {0} invalid answers")]
    RetriesExhausted(usize),
    #[error("failed to copy entry to clipboard: {0:#}")]
    Clipboard(anyhow::Error),
}

/// How a browsing session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseOutcome {
    /// Nothing to show; no prompt was issued
    Empty,
    Quit,
    /// Zero-based index of the entry copied to the clipboard
    Selected(usize),
}

/// A parsed answer to the selection prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// One-based position across the whole list
    Entry(usize),
    Next,
    Quit,
}

impl Choice {
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim() {
            "q" | "quit" => Some(Choice::Quit),
            "n" => Some(Choice::Next),
            digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                digits.parse().ok().map(Choice::Entry)
            }
            _ => None,
        }
    }
}

/// Entries per page for a terminal with `rows` rows
pub fn page_size(rows: u16) -> usize {
    ((PAGE_ROW_FRACTION * f64::from(rows)).floor() as usize).max(MIN_PAGE_SIZE)
}

/// Terminal (columns, rows), falling back to 80x24 when not attached to a tty
pub fn terminal_dimensions() -> (u16, u16) {
    crossterm::terminal::size()
        .ok()
        .filter(|(cols, rows)| *cols > 0 && *rows > 0)
        .unwrap_or(FALLBACK_TERMINAL)
}

pub struct HistoryBrowser<R, W, C> {
    input: R,
    output: W,
    clipboard: C,
    page_size: usize,
    preview_width: usize,
    color: bool,
}

impl<R: BufRead, W: Write, C: ClipboardSink> HistoryBrowser<R, W, C> {
    pub fn new(input: R, output: W, clipboard: C) -> Self {
        Self {
            input,
            output,
            clipboard,
            page_size: MIN_PAGE_SIZE,
            preview_width: usize::from(FALLBACK_TERMINAL.0) * 3 / 4,
            color: false,
        }
    }

    /// Size pages and previews to a terminal of `columns` x `rows`.
    pub fn with_terminal(mut self, columns: u16, rows: u16) -> Self {
        self.page_size = page_size(rows);
        self.preview_width = (usize::from(columns) * 3 / 4).max(20);
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Print entries `[start, start + count)` numbered `start + 1 ..`.
    pub fn render(&mut self, list: &[String], start: usize, count: usize) -> io::Result<()> {
        if list.is_empty() {
            writeln!(self.output, "No matching entries found.")?;
            return Ok(());
        }

        for (offset, entry) in list.iter().skip(start).take(count).enumerate() {
            let number = (start + offset + 1).to_string();
            let number = if self.color {
                number.blue().bold().to_string()
            } else {
                number
            };
            writeln!(
                self.output,
                "({})\t {}",
                number,
                single_line_preview(entry, self.preview_width)
            )?;
        }
        self.output.flush()
    }

    /// Show the list and loop on the prompt until the user selects or quits.
    pub fn browse(&mut self, list: &[String]) -> Result<BrowseOutcome, BrowserError> {
        let count = self.page_size;
        self.render(list, 0, count)?;
        if list.is_empty() {
            return Ok(BrowseOutcome::Empty);
        }

        let mut start = 0;
        loop {
            match self.prompt_for_selection(list.len())? {
                Choice::Quit => return Ok(BrowseOutcome::Quit),
                Choice::Next if start + count >= list.len() => {
                    writeln!(self.output, "End of history.")?;
                }
                Choice::Next => {
                    start += count;
                    self.render(list, start, count)?;
                }
                Choice::Entry(number) => {
                    let index = number - 1;
                    self.clipboard
                        .write_text(&list[index])
                        .map_err(BrowserError::Clipboard)?;
                    writeln!(self.output, "Copied entry {} to clipboard.", number)?;
                    tracing::info!("Copied history entry {} to clipboard", number);
                    return Ok(BrowseOutcome::Selected(index));
                }
            }
        }
    }

    /// Ask until a valid answer arrives. Entry numbers are checked against `len`.
    pub fn prompt_for_selection(&mut self, len: usize) -> Result<Choice, BrowserError> {
        let mut invalid = 0;
        loop {
            write!(
                self.output,
                "Enter a number to load the clip to clipboard. Type 'q' to quit or 'n' to show the next {} clips.\n> ",
                self.page_size
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(BrowserError::InputClosed);
            }

            match Choice::parse(&line) {
                Some(Choice::Entry(number)) if number == 0 || number > len => {
                    writeln!(
                        self.output,
                        "Please enter a number between 1 and {}.",
                        len
                    )?;
                }
                Some(choice) => return Ok(choice),
                None => {
                    writeln!(
                        self.output,
                        "Please enter a number. Type 'q' to quit or 'n' to show the next {} clips.",
                        self.page_size
                    )?;
                }
            }

            invalid += 1;
            if invalid >= MAX_INVALID_INPUTS {
                return Err(BrowserError::RetriesExhausted(invalid));
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Flatten `entry` onto one line and cut it to `width` characters.
fn single_line_preview(entry: &str, width: usize) -> String {
    let flat = entry.replace('\r', "").replace('\n', "\\n");
    let flat = flat.trim();
    if flat.chars().count() <= width {
        flat.to_string()
    } else {
        flat.chars().take(width).collect()
    }
}
