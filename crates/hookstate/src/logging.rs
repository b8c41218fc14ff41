//! Tracing setup.
//!
//! The hook ingestor and the watcher own stdout, so they log to files under
//! `$XDG_STATE_HOME/hookstate/`. One-shot commands log to stderr.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Log filter override, takes precedence over `RUST_LOG`.
pub const ENV_LOG: &str = "HOOKSTATE_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// `hook.log`, quiet by default.
    Hook,
    /// `watch.log`.
    Watch,
    Stderr,
}

impl LogTarget {
    fn file_name(self) -> Option<&'static str> {
        match self {
            Self::Hook => Some("hook.log"),
            Self::Watch => Some("watch.log"),
            Self::Stderr => None,
        }
    }

    fn default_directive(self) -> &'static str {
        match self {
            Self::Hook => "warn",
            Self::Watch => "hookstate=info",
            Self::Stderr => "hookstate=warn",
        }
    }
}

pub fn log_dir() -> Option<PathBuf> {
    if let Some(xdg_state) = env::var_os("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("hookstate"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/hookstate"))
}

fn open_log_file(name: &str) -> Option<File> {
    let dir = log_dir()?;
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(name))
        .ok()
}

fn env_filter(default_directive: &str) -> EnvFilter {
    if let Ok(spec) = env::var(ENV_LOG) {
        return EnvFilter::new(spec);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs the global subscriber. Logging is switched off if the log file
/// cannot be opened.
pub fn init(target: LogTarget) {
    let filter = env_filter(target.default_directive());

    let Some(name) = target.file_name() else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    };

    match open_log_file(name) {
        Some(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets() {
        assert_eq!(LogTarget::Hook.file_name(), Some("hook.log"));
        assert_eq!(LogTarget::Watch.file_name(), Some("watch.log"));
        assert_eq!(LogTarget::Stderr.file_name(), None);
        assert_eq!(LogTarget::Hook.default_directive(), "warn");
    }
}
