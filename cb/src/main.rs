// cb: CLI for the clipboard history tracker
//
// Commands:
//   cb tracker start | stop | restart | status
//   cb tracker open                  Open the history file in $EDITOR
//   cb tracker list                  Browse history and copy an entry
//   cb tracker enable-boot [--dry-run]

use anyhow::{Context, Result};
use cb_lib::{
    cli_paths,
    clipboard::{ClipboardSink, HandoffClipboard, SystemClipboard},
    config::{ConfigLayer, TrackerConfig},
    logging,
    tracker::{
        boot,
        browser::{self, BrowseOutcome, BrowserError, HistoryBrowser},
        history,
        process::OsProcessControl,
        supervisor::{StartOutcome, Supervisor},
    },
};
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "cb", version, about = "Clipboard manager")]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalOptions {
    /// Maximum number of clipboard history entries to keep
    #[arg(long = "maxClipHistory", global = true)]
    max_clip_history: Option<usize>,

    /// Path to file where clipboard history should be stored
    #[arg(long = "historyFile", global = true)]
    history_file: Option<PathBuf>,

    /// Path to directory to store logs (and the tracker PID file) in
    #[arg(long = "logsPath", global = true)]
    logs_path: Option<PathBuf>,

    /// Clipboard polling interval in milliseconds
    #[arg(long = "pollInterval", global = true)]
    poll_interval_ms: Option<u64>,

    /// Editor to use when opening files for editing
    #[arg(long, short = 'e', global = true)]
    editor: Option<String>,

    /// Path to the settings file layered over defaults.json
    #[arg(long = "configFile", global = true)]
    config_file: Option<PathBuf>,

    /// Also print logs to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

impl GlobalOptions {
    fn into_layer(self) -> ConfigLayer {
        ConfigLayer {
            config_file: self.config_file,
            history_file: self.history_file,
            logs_path: self.logs_path,
            max_clip_history: self.max_clip_history,
            poll_interval_ms: self.poll_interval_ms,
            editor: self.editor,
            normalize_whitespace: None,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Track clipboard history in the background
    Tracker {
        #[command(subcommand)]
        action: TrackerAction,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum TrackerAction {
    /// Start tracking in a detached background process
    Start,
    /// Stop the background tracker
    Stop,
    /// Stop (if running) and start the tracker
    Restart,
    /// Report whether the tracker is running
    Status,
    /// Open the history file in the configured editor
    Open,
    /// Browse history and copy an entry to the clipboard
    List,
    /// Register a systemd user service that starts the tracker on login
    EnableBoot {
        /// Print the unit file instead of installing it
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let verbose = cli.options.verbose;

    let config = TrackerConfig::load(cli.options.into_layer())?;
    config.ensure_dirs().with_context(|| {
        format!(
            "Failed to create logs directory {}",
            config.logs_path.display()
        )
    })?;
    logging::init_cli(&config.logs_path, verbose)?;
    tracing::info!(
        "Executing command: `cb {}`",
        std::env::args().skip(1).collect::<Vec<_>>().join(" ")
    );
    if verbose {
        tracing::debug!("Current configuration: {:?}", config);
    }

    match cli.command {
        Command::Tracker { action } => run_tracker(action, config),
    }
}

fn run_tracker(action: TrackerAction, config: TrackerConfig) -> Result<ExitCode> {
    match action {
        TrackerAction::Start => {
            let outcome = supervisor(config).start()?;
            report_start(&outcome);
        }
        TrackerAction::Stop => {
            let outcome = supervisor(config).stop()?;
            if outcome.is_failure() {
                eprintln!("{}", outcome);
            } else {
                println!("{}", outcome);
            }
        }
        TrackerAction::Restart => {
            let outcome = supervisor(config).restart()?;
            if outcome.stop.is_failure() {
                eprintln!("{}", outcome.stop);
            }
            report_start(&outcome.start);
        }
        TrackerAction::Status => {
            println!("{}", supervisor(config).status()?);
        }
        TrackerAction::Open => {
            supervisor(config).open()?;
        }
        TrackerAction::List => return list_history(&config),
        TrackerAction::EnableBoot { dry_run } => {
            let cli_path = cli_paths::resolve_cli_path().context("Failed to locate cb binary")?;
            if dry_run {
                print!("{}", boot::render_unit(&cli_path));
            } else {
                let unit_path = boot::enable(&cli_path)?;
                println!("Installed and enabled {}", unit_path.display());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn supervisor(config: TrackerConfig) -> Supervisor<OsProcessControl> {
    let tracker_bin = cli_paths::resolve_tracker_path();
    if tracker_bin.is_none() {
        tracing::debug!(
            "{} not found next to cb, on PATH or via {}",
            cli_paths::tracker_binary_name(),
            cli_paths::TRACKER_BIN_ENV
        );
    }
    Supervisor::new(config, OsProcessControl, tracker_bin)
}

fn report_start(outcome: &StartOutcome) {
    if let StartOutcome::Started {
        replaced_stale: Some(pid),
        ..
    } = outcome
    {
        println!("Replaced stale PID file (process {} had exited).", pid);
    }
    println!("{}", outcome);
}

/// Where `list` copies the chosen entry.
///
/// On Linux the selection dies with its owner, so the text goes to a detached
/// `cb-tracker --serve-clipboard` when that binary is available.
fn clipboard_sink(config: &TrackerConfig) -> Box<dyn ClipboardSink> {
    if cfg!(target_os = "linux") {
        match cli_paths::resolve_tracker_path() {
            Some(tracker_bin) => {
                return Box::new(HandoffClipboard::via_tracker(
                    &tracker_bin,
                    &config.logs_path,
                ))
            }
            None => tracing::warn!(
                "{} not found; copied text lasts only while cb runs",
                cli_paths::tracker_binary_name()
            ),
        }
    }
    Box::new(SystemClipboard::new())
}

fn list_history(config: &TrackerConfig) -> Result<ExitCode> {
    let list = history::load_or_empty(&config.history_file);
    let (columns, rows) = browser::terminal_dimensions();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let color = stdout.is_terminal();
    let mut browser = HistoryBrowser::new(stdin.lock(), stdout.lock(), clipboard_sink(config))
        .with_terminal(columns, rows)
        .with_color(color);

    match browser.browse(&list) {
        Ok(BrowseOutcome::Empty | BrowseOutcome::Quit | BrowseOutcome::Selected(_)) => {
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ (BrowserError::InputClosed | BrowserError::RetriesExhausted(_))) => {
            tracing::error!("History browser aborted: {}", err);
            eprintln!("{}", err);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}
