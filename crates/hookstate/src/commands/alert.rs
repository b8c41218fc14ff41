//! `hookstate alert ...`: manual control of the tmux window alert.

use anyhow::{Context, Result};
use hookstate_core::{AgentState, Config};
use hookstate_tmux::{AlertPropagator, Multiplexer, TmuxCli};
use tracing::debug;

pub fn propagator(config: &Config) -> AlertPropagator<TmuxCli> {
    AlertPropagator::new(TmuxCli::from_env(), config.alert.clone())
}

/// Clears the alert on `window`, or on this pane's window.
///
/// Runs from a tmux hook in the background, so failures are only logged.
pub async fn clear<M: Multiplexer>(alert: &AlertPropagator<M>, window: Option<&str>) {
    let result = match window {
        Some(window) => alert.clear_window(window).await,
        None => alert.clear().await,
    };
    if let Err(e) = result {
        debug!(?window, error = %e, "Alert not cleared");
    }
}

pub async fn set<M: Multiplexer>(alert: &AlertPropagator<M>, state: AgentState) -> Result<()> {
    alert
        .try_apply(state)
        .await
        .with_context(|| format!("Failed to set the {state} alert"))
}

/// Returns a human-readable outcome.
pub async fn install_focus_hook<M: Multiplexer>(
    alert: &AlertPropagator<M>,
    executable: &str,
) -> Result<&'static str> {
    let added = alert
        .install_focus_hook(executable)
        .await
        .context("Failed to register the tmux focus hook")?;
    Ok(if added {
        "Focus hook installed"
    } else {
        "Focus hook already installed"
    })
}
