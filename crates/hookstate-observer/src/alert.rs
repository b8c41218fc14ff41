//! Where the registry sends state changes of the followed session.

use async_trait::async_trait;
use hookstate_core::AgentState;
use hookstate_tmux::{AlertPropagator, Multiplexer};
use tracing::debug;

/// Receiver of alert side effects. Implementations must not fail: a broken
/// alert never affects state tracking.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// The followed session is now in `state`.
    async fn show(&self, state: AgentState);

    /// Withdraws any alert, e.g. on shutdown.
    async fn withdraw(&self);
}

#[async_trait]
impl<M: Multiplexer + 'static> AlertSink for AlertPropagator<M> {
    async fn show(&self, state: AgentState) {
        self.apply(state).await;
    }

    async fn withdraw(&self) {
        if let Err(e) = self.clear().await {
            debug!(error = %e, "Alert clear skipped");
        }
    }
}
