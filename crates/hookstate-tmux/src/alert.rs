//! Alert propagation onto the consumer's tmux window.
//!
//! # Protocol
//!
//! 1. Resolve the window owning our own pane (never the focused one).
//! 2. Before the first mutation, capture the window's pre-alert
//!    `window-status-format` into the `@hookstate_baseline` window option.
//!    A cached baseline that looks like one of our alert formats is
//!    discarded and recaptured.
//! 3. Apply the alert by overriding `window-status-format` on that window
//!    and recording the state in `@hookstate_state`.
//! 4. Clear by unsetting the window overrides so the global format applies
//!    again. The baseline string is never re-applied: it may carry style
//!    sequences that do not survive another trip through tmux.
//!
//! A `session-window-changed` hook, installed once, clears the alert when
//! the user switches to the window. Unlike `pane-focus-in` it fires without
//! the `focus-events` option, which tmux leaves off by default.

use hookstate_core::{AgentState, AlertConfig};
use tracing::{debug, info, warn};

use crate::error::TmuxResult;
use crate::multiplexer::Multiplexer;

pub const STATUS_FORMAT: &str = "window-status-format";
pub const BASELINE_OPTION: &str = "@hookstate_baseline";
pub const STATE_OPTION: &str = "@hookstate_state";

/// Prefix of every format we inject. It expands to nothing in tmux.
pub const ALERT_MARKER: &str = "#{?@hookstate_state,,}";

/// tmux's own default, used when no clean baseline can be found.
pub const DEFAULT_WINDOW_FORMAT: &str = "#I:#W#{?window_flags,#{window_flags}, }";

pub const FOCUS_HOOK: &str = "session-window-changed";
const FOCUS_HOOK_SIGNATURE: &str = "alert clear --window";

/// Builds the `run-shell` command the focus hook runs.
pub fn focus_hook_command(executable: &str) -> String {
    format!("run-shell -b '{executable} alert clear --window #{{window_id}}'")
}

/// Builds the alert format for a baseline and color.
pub fn alert_format(baseline: &str, color: &str) -> String {
    format!("{ALERT_MARKER}#[fg={color},bold]{baseline}#[default]")
}

pub struct AlertPropagator<M> {
    mux: M,
    config: AlertConfig,
}

impl<M: Multiplexer> AlertPropagator<M> {
    pub fn new(mux: M, config: AlertConfig) -> Self {
        Self { mux, config }
    }

    /// True if `format` is (or contains) something we injected.
    pub fn is_alert_format(&self, format: &str) -> bool {
        format.contains(ALERT_MARKER) || self.config.palette().any(|color| format.contains(color))
    }

    /// Applies the alert for `state`, logging and swallowing failures.
    ///
    /// Running outside tmux is the common case and is not worth more than a
    /// debug line.
    pub async fn apply(&self, state: AgentState) {
        if let Err(e) = self.try_apply(state).await {
            debug!(state = %state, error = %e, "Alert propagation skipped");
        }
    }

    /// Applies the alert for `state` on our own window.
    ///
    /// States without a configured color (always `idle`) clear the alert.
    pub async fn try_apply(&self, state: AgentState) -> TmuxResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let window = self.mux.own_window().await?;
        match self.config.color_for(state) {
            Some(color) => self.mark_window(&window, state, color).await,
            None => self.clear_window(&window).await,
        }
    }

    /// Clears the alert on our own window.
    pub async fn clear(&self) -> TmuxResult<()> {
        let window = self.mux.own_window().await?;
        self.clear_window(&window).await
    }

    /// Removes the window overrides. The baseline stays cached.
    pub async fn clear_window(&self, window: &str) -> TmuxResult<()> {
        self.mux.unset_window_option(window, STATUS_FORMAT).await?;
        self.mux.unset_window_option(window, STATE_OPTION).await?;
        debug!(window, "Alert cleared");
        Ok(())
    }

    async fn mark_window(&self, window: &str, state: AgentState, color: &str) -> TmuxResult<()> {
        let baseline = self.baseline(window).await?;
        let format = alert_format(&baseline, color);
        self.mux
            .set_window_option(window, STATUS_FORMAT, &format)
            .await?;
        self.mux
            .set_window_option(window, STATE_OPTION, state.as_str())
            .await?;
        debug!(window, state = %state, color, "Alert applied");
        Ok(())
    }

    /// Returns the window's baseline format, capturing it on first use.
    pub async fn baseline(&self, window: &str) -> TmuxResult<String> {
        if let Some(cached) = self.mux.window_option(window, BASELINE_OPTION).await? {
            if !self.is_alert_format(&cached) {
                return Ok(cached);
            }
            warn!(window, "Discarding cached baseline that contains an alert format");
            self.mux.unset_window_option(window, BASELINE_OPTION).await?;
        }

        let local = self.mux.window_option(window, STATUS_FORMAT).await?;
        let global = self.mux.global_window_option(STATUS_FORMAT).await?;
        let baseline = [local, global]
            .into_iter()
            .flatten()
            .find(|format| !self.is_alert_format(format))
            .unwrap_or_else(|| DEFAULT_WINDOW_FORMAT.to_string());

        self.mux
            .set_window_option(window, BASELINE_OPTION, &baseline)
            .await?;
        debug!(window, baseline = %baseline, "Baseline captured");
        Ok(baseline)
    }

    /// Registers the focus hook that clears the alert.
    ///
    /// Returns false if an equivalent hook is already registered.
    pub async fn install_focus_hook(&self, executable: &str) -> TmuxResult<bool> {
        let hooks = self.mux.global_hook(FOCUS_HOOK).await?;
        let installed = hooks
            .iter()
            .any(|line| line.contains(FOCUS_HOOK_SIGNATURE));
        if installed {
            debug!("Focus hook already installed");
            return Ok(false);
        }

        self.mux
            .append_global_hook(FOCUS_HOOK, &focus_hook_command(executable))
            .await?;
        info!(hook = FOCUS_HOOK, "Focus hook installed");
        Ok(true)
    }
}
