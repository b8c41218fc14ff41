//! User configuration loaded from `config.toml`.
//!
//! Every field has a default, so an absent or partial file is fine. A file
//! that fails to parse is logged and replaced by defaults: configuration
//! problems must never stop the ingestor from recording state.
//!
//! ```toml
//! state_dir = ".hookstate"
//!
//! [timing]
//! debounce_ms = 50
//! poll_interval_ms = 200
//! completion_ms = 2000
//! recovery_ms = 60000
//!
//! [watch]
//! strategy = "notify"   # or "poll"
//!
//! [alert]
//! enabled = true
//! processing = "colour39"
//! waiting = "colour214"
//! done = "colour34"
//!
//! [refresh]
//! tools = ["Edit", "Write", "MultiEdit", "NotebookEdit"]
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{AgentState, DEFAULT_REFRESH_TOOLS};

/// Overrides the state directory (absolute, or relative to the project dir).
pub const ENV_STATE_DIR: &str = "HOOKSTATE_DIR";
/// Overrides the config file location.
pub const ENV_CONFIG: &str = "HOOKSTATE_CONFIG";
/// Explicit session key for the consumer.
pub const ENV_SESSION: &str = "HOOKSTATE_SESSION";

pub const DEFAULT_STATE_DIR: &str = ".hookstate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub state_dir: PathBuf,
    pub timing: TimingConfig,
    pub watch: WatchConfig,
    pub alert: AlertConfig,
    pub refresh: RefreshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            timing: TimingConfig::default(),
            watch: WatchConfig::default(),
            alert: AlertConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

/// Debounce, poll and timer windows, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub completion_ms: u64,
    pub recovery_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            poll_interval_ms: 200,
            completion_ms: 2_000,
            recovery_ms: 60_000,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn completion(&self) -> Duration {
        Duration::from_millis(self.completion_ms)
    }

    pub fn recovery(&self) -> Duration {
        Duration::from_millis(self.recovery_ms)
    }
}

/// How the observer learns about changes in the state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStrategy {
    /// OS file-change notification (inotify, FSEvents, ...).
    #[default]
    Notify,
    /// Fixed-interval modification-time polling.
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub strategy: WatchStrategy,
}

/// Multiplexer alert colors, as tmux style colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    /// `None` disables the marker while processing.
    pub processing: Option<String>,
    pub waiting: Option<String>,
    pub done: Option<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            processing: Some("colour39".to_string()),
            waiting: Some("colour214".to_string()),
            done: Some("colour34".to_string()),
        }
    }
}

impl AlertConfig {
    /// Color for a state, or `None` when that state carries no alert.
    pub fn color_for(&self, state: AgentState) -> Option<&str> {
        match state {
            AgentState::Idle => None,
            AgentState::Processing => self.processing.as_deref(),
            AgentState::Waiting => self.waiting.as_deref(),
            AgentState::Done => self.done.as_deref(),
        }
    }

    /// Every configured alert color.
    pub fn palette(&self) -> impl Iterator<Item = &str> {
        [&self.processing, &self.waiting, &self.done]
            .into_iter()
            .filter_map(|c| c.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Tool names whose `PostToolUse` also writes the refresh signal.
    pub tools: Vec<String>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            tools: DEFAULT_REFRESH_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(ENV_CONFIG) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("hookstate").join("config.toml"))
    }

    /// Loads the config from the default location.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Loads the config from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No config file, using defaults");
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
            Self::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolves the state directory for a project.
    ///
    /// `HOOKSTATE_DIR` wins over the configured `state_dir`; relative paths
    /// are joined onto `project_dir`.
    pub fn state_dir_for(&self, project_dir: &Path) -> PathBuf {
        let configured = env::var_os(ENV_STATE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.state_dir.clone());
        if configured.is_absolute() {
            configured
        } else {
            project_dir.join(configured)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.timing.debounce(), Duration::from_millis(50));
        assert_eq!(config.timing.poll_interval(), Duration::from_millis(200));
        assert_eq!(config.timing.completion(), Duration::from_millis(2_000));
        assert_eq!(config.timing.recovery(), Duration::from_millis(60_000));
        assert_eq!(config.watch.strategy, WatchStrategy::Notify);
        assert!(config.refresh.tools.iter().any(|t| t == "Edit"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [timing]
            completion_ms = 3000

            [watch]
            strategy = "poll"
            "#,
        )
        .unwrap();
        assert_eq!(config.timing.completion_ms, 3_000);
        assert_eq!(config.timing.recovery_ms, 60_000);
        assert_eq!(config.watch.strategy, WatchStrategy::Poll);
        assert!(config.alert.enabled);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "timing = 12 = 3").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_alert_palette() {
        let alert = AlertConfig {
            processing: None,
            ..AlertConfig::default()
        };
        assert_eq!(alert.color_for(AgentState::Processing), None);
        assert_eq!(alert.color_for(AgentState::Idle), None);
        assert_eq!(alert.color_for(AgentState::Waiting), Some("colour214"));
        assert_eq!(alert.palette().count(), 2);
    }

    #[test]
    fn test_relative_state_dir_joins_project() {
        let config = Config {
            state_dir: PathBuf::from("/abs/state"),
            ..Config::default()
        };
        if env::var_os(ENV_STATE_DIR).is_none() {
            assert_eq!(
                config.state_dir_for(Path::new("/project")),
                PathBuf::from("/abs/state")
            );
            assert_eq!(
                Config::default().state_dir_for(Path::new("/project")),
                PathBuf::from("/project/.hookstate")
            );
        }
    }
}
