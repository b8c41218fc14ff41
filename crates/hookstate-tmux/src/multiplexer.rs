//! The multiplexer boundary.
//!
//! The alert protocol needs only a handful of primitives: resolve the window
//! that owns our pane, read/write/unset per-window options (custom `@`
//! variables and the window-status formats alike), read a global window
//! option and register a global hook. `TmuxCli` implements them by shelling
//! out to the `tmux` binary.
//!
//! tmux keeps session hooks and window/pane hooks apart: `show-hooks -g`
//! lists only the former, `show-hooks -gw` only the latter.

use std::env;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::error::{TmuxError, TmuxResult};

#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Window id (e.g. `@3`) of the pane this process runs in.
    ///
    /// Must not fall back to the focused window: when the consumer is not the
    /// active pane that would decorate somebody else's window.
    async fn own_window(&self) -> TmuxResult<String>;

    /// Window-local value of an option, `None` if it is not set on the window.
    async fn window_option(&self, window: &str, name: &str) -> TmuxResult<Option<String>>;

    async fn set_window_option(&self, window: &str, name: &str, value: &str) -> TmuxResult<()>;

    /// Removes a window-local override so the global value applies again.
    async fn unset_window_option(&self, window: &str, name: &str) -> TmuxResult<()>;

    /// Global window option value, `None` if unset.
    async fn global_window_option(&self, name: &str) -> TmuxResult<Option<String>>;

    /// Commands registered on the global `hook`, one `hook[i] command` line each.
    async fn global_hook(&self, hook: &str) -> TmuxResult<Vec<String>>;

    /// Appends a command to a global hook.
    async fn append_global_hook(&self, hook: &str, command: &str) -> TmuxResult<()>;
}

/// Returns true if `TMUX` is set, i.e. we run inside a tmux client.
#[must_use]
pub fn is_in_tmux() -> bool {
    env::var_os("TMUX").is_some()
}

/// Which option table a hook lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    Session,
    Window,
}

impl HookScope {
    /// Window and pane hooks are named `window-*` and `pane-*`. Everything
    /// else, including `session-window-changed`, is a session hook.
    pub fn of(hook: &str) -> Self {
        if hook.starts_with("window-") || hook.starts_with("pane-") {
            Self::Window
        } else {
            Self::Session
        }
    }

    fn show_flag(self) -> &'static str {
        match self {
            Self::Session => "-g",
            Self::Window => "-gw",
        }
    }
}

/// Picks the entries of `hook` out of `show-hooks` output.
///
/// Entries look like `hook[0] command`. A hook with nothing registered is
/// listed by bare name and yields nothing.
pub fn hook_entries(output: &str, hook: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| {
            line.strip_prefix(hook)
                .is_some_and(|rest| rest.starts_with('[') || rest.starts_with(' '))
        })
        .map(str::to_string)
        .collect()
}

/// `Multiplexer` over the tmux command line.
#[derive(Debug, Clone)]
pub struct TmuxCli {
    binary: String,
    pane: Option<String>,
}

impl TmuxCli {
    /// Uses `tmux` from `PATH` and the pane from `TMUX_PANE`.
    pub fn from_env() -> Self {
        let pane = if is_in_tmux() {
            env::var("TMUX_PANE").ok().filter(|p| !p.is_empty())
        } else {
            None
        };
        Self {
            binary: "tmux".to_string(),
            pane,
        }
    }

    async fn run(&self, args: &[&str]) -> TmuxResult<String> {
        trace!(?args, "tmux");
        let output = Command::new(&self.binary).args(args).output().await?;

        if !output.status.success() {
            return Err(TmuxError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches(['\n', '\r']).to_string())
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[async_trait]
impl Multiplexer for TmuxCli {
    async fn own_window(&self) -> TmuxResult<String> {
        let pane = self.pane.as_deref().ok_or(TmuxError::NotInTmux)?;
        let window = self
            .run(&["display-message", "-p", "-t", pane, "#{window_id}"])
            .await?;
        if window.starts_with('@') {
            Ok(window)
        } else {
            Err(TmuxError::UnexpectedOutput(window))
        }
    }

    async fn window_option(&self, window: &str, name: &str) -> TmuxResult<Option<String>> {
        self.run(&["show-options", "-wqv", "-t", window, name])
            .await
            .map(non_empty)
    }

    async fn set_window_option(&self, window: &str, name: &str, value: &str) -> TmuxResult<()> {
        self.run(&["set-option", "-wq", "-t", window, name, value])
            .await
            .map(drop)
    }

    async fn unset_window_option(&self, window: &str, name: &str) -> TmuxResult<()> {
        self.run(&["set-option", "-wqu", "-t", window, name])
            .await
            .map(drop)
    }

    async fn global_window_option(&self, name: &str) -> TmuxResult<Option<String>> {
        self.run(&["show-options", "-gwqv", name]).await.map(non_empty)
    }

    async fn global_hook(&self, hook: &str) -> TmuxResult<Vec<String>> {
        let out = self
            .run(&["show-hooks", HookScope::of(hook).show_flag()])
            .await?;
        Ok(hook_entries(&out, hook))
    }

    async fn append_global_hook(&self, hook: &str, command: &str) -> TmuxResult<()> {
        let flags = match HookScope::of(hook) {
            HookScope::Session => "-ga",
            HookScope::Window => "-gwa",
        };
        self.run(&["set-hook", flags, hook, command]).await.map(drop)
    }
}
