// Configuration for the clipboard history tracker
// Layers built-in defaults, the user's defaults.json and settings.json, and CLI overrides

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the base configuration directory
pub const CONFIG_DIR_ENV: &str = "CB_CONFIG_DIR";

pub const DEFAULT_MAX_CLIP_HISTORY: usize = 100;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const MIN_POLL_INTERVAL_MS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("maxClipHistory must be at least 1")]
    ZeroHistory,
    #[error("pollIntervalMs must be at least 10, got {0}")]
    PollTooFast(u64),
}

/// Immutable per-invocation tracker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// JSON file holding the newest-first clipboard history
    pub history_file: PathBuf,
    /// Directory for logs and the tracker PID file
    pub logs_path: PathBuf,
    /// Upper bound on the number of history entries
    pub max_clip_history: usize,
    /// Sampling period of the tracker daemon
    pub poll_interval_ms: u64,
    /// Editor used by `tracker open`
    pub editor: String,
    /// Collapse newlines and whitespace runs before recording an entry
    #[serde(default)]
    pub normalize_whitespace: bool,
}

/// Partial config as found in defaults.json / settings.json
///
/// Unknown keys (clipsFile, imagesPath, ...) belong to other commands and are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    pub config_file: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
    pub logs_path: Option<PathBuf>,
    pub max_clip_history: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub editor: Option<String>,
    pub normalize_whitespace: Option<bool>,
}

impl ConfigLayer {
    /// Read a layer from disk. Missing and blank files yield an empty layer.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply(self, config: &mut TrackerConfig) {
        if let Some(history_file) = self.history_file {
            config.history_file = history_file;
        }
        if let Some(logs_path) = self.logs_path {
            config.logs_path = logs_path;
        }
        if let Some(max) = self.max_clip_history {
            config.max_clip_history = max;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(editor) = self.editor {
            config.editor = editor;
        }
        if let Some(normalize) = self.normalize_whitespace {
            config.normalize_whitespace = normalize;
        }
    }
}

impl TrackerConfig {
    /// Built-in defaults rooted at `base_dir`
    pub fn defaults_in(base_dir: &Path) -> Self {
        Self {
            history_file: base_dir.join("history.json"),
            logs_path: base_dir.join("logs"),
            max_clip_history: DEFAULT_MAX_CLIP_HISTORY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            editor: Self::default_editor(),
            normalize_whitespace: false,
        }
    }

    /// Resolve the full configuration: defaults, then defaults.json, then the
    /// configured settings file, then `overrides` (usually CLI flags).
    pub fn load(overrides: ConfigLayer) -> Result<Self, ConfigError> {
        Self::load_from(&Self::base_dir(), overrides)
    }

    pub fn load_from(base_dir: &Path, overrides: ConfigLayer) -> Result<Self, ConfigError> {
        let mut config = Self::defaults_in(base_dir);

        let user_defaults = ConfigLayer::read(&base_dir.join("defaults.json"))?;
        let config_file = overrides
            .config_file
            .clone()
            .or_else(|| user_defaults.config_file.clone())
            .unwrap_or_else(|| base_dir.join("settings.json"));
        user_defaults.apply(&mut config);

        ConfigLayer::read(&config_file)?.apply(&mut config);
        overrides.apply(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Base configuration directory: `$CB_CONFIG_DIR` or `~/.config/cb`
    pub fn base_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return PathBuf::from(dir);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("cb"))
            .unwrap_or_else(|| PathBuf::from("/tmp/cb"))
    }

    fn default_editor() -> String {
        std::env::var("EDITOR")
            .ok()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "nano".to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clip_history == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::PollTooFast(self.poll_interval_ms));
        }
        Ok(())
    }

    /// Path to the tracker PID file
    pub fn pid_file(&self) -> PathBuf {
        self.logs_path.join("tracker.pid")
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// Ensure the logs directory exists (it also holds the PID file)
    ///
    /// A directory created here is private to the user; an existing one keeps
    /// its permissions.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if self.logs_path.is_dir() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.logs_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.logs_path, std::fs::Permissions::from_mode(0o700))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = TrackerConfig::load_from(temp_dir.path(), ConfigLayer::default()).unwrap();

        assert_eq!(config.history_file, temp_dir.path().join("history.json"));
        assert_eq!(config.logs_path, temp_dir.path().join("logs"));
        assert_eq!(config.max_clip_history, DEFAULT_MAX_CLIP_HISTORY);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.pid_file(), temp_dir.path().join("logs/tracker.pid"));
    }

    #[test]
    fn test_layers_apply_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let settings = temp_dir.path().join("custom-settings.json");
        std::fs::write(
            temp_dir.path().join("defaults.json"),
            format!(
                r#"{{"configFile": "{}", "maxClipHistory": 20, "clipsFile": "/ignored.json"}}"#,
                settings.display()
            ),
        )
        .unwrap();
        std::fs::write(&settings, r#"{"maxClipHistory": 30, "editor": "vim"}"#).unwrap();

        let overrides = ConfigLayer {
            history_file: Some(PathBuf::from("/tmp/override.json")),
            ..Default::default()
        };
        let config = TrackerConfig::load_from(temp_dir.path(), overrides).unwrap();

        assert_eq!(config.max_clip_history, 30);
        assert_eq!(config.editor, "vim");
        assert_eq!(config.history_file, PathBuf::from("/tmp/override.json"));
    }

    #[test]
    fn test_blank_settings_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("settings.json"), "  \n").unwrap();

        let config = TrackerConfig::load_from(temp_dir.path(), ConfigLayer::default()).unwrap();
        assert_eq!(config.max_clip_history, DEFAULT_MAX_CLIP_HISTORY);
    }

    #[test]
    fn test_malformed_settings_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("settings.json"), "{not json").unwrap();

        let err = TrackerConfig::load_from(temp_dir.path(), ConfigLayer::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("settings.json"));
    }

    #[test]
    fn test_validate_rejects_zero_history() {
        let temp_dir = TempDir::new().unwrap();
        let overrides = ConfigLayer {
            max_clip_history: Some(0),
            ..Default::default()
        };

        let err = TrackerConfig::load_from(temp_dir.path(), overrides).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroHistory));
    }

    #[test]
    fn test_config_json_roundtrip_uses_camel_case() {
        let temp_dir = TempDir::new().unwrap();
        let config = TrackerConfig::defaults_in(temp_dir.path());

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"historyFile\""));
        assert!(json.contains("\"maxClipHistory\""));

        let parsed: TrackerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dirs_creates_logs_path_with_0700() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let config = TrackerConfig::defaults_in(temp_dir.path());
        config.ensure_dirs().unwrap();

        let mode = std::fs::metadata(&config.logs_path)
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dirs_leaves_existing_directory_alone() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let shared = temp_dir.path().join("shared-logs");
        std::fs::create_dir(&shared).unwrap();
        std::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = TrackerConfig::defaults_in(temp_dir.path());
        config.logs_path = shared.clone();
        config.ensure_dirs().unwrap();

        let mode = std::fs::metadata(&shared).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }
}
