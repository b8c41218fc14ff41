//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` is cheap to clone. Besides the command helpers it
//! carries the UI status boundary: `icon`, `color`, `status_line` and
//! `reconcile`.

use std::path::PathBuf;

use hookstate_core::{state_color, state_icon, AgentState, SessionKey, StatusSnapshot};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{
    ReconcileReport, RegistryCommand, RegistryError, SessionEvent, SessionSummary,
};

// ============================================================================
// Registry Handle
// ============================================================================

#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,

    /// Event broadcaster for subscribing to updates
    event_sender: broadcast::Sender<SessionEvent>,
}

impl RegistryHandle {
    pub fn new(
        sender: mpsc::Sender<RegistryCommand>,
        event_sender: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Reports a debounced batch of changed store files.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn files_changed(&self, paths: Vec<PathBuf>) -> Result<(), RegistryError> {
        self.sender
            .send(RegistryCommand::FilesChanged { paths })
            .await
            .map_err(|_| RegistryError::ChannelClosed)
    }

    /// Status snapshot of `key`, or of the followed session.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn status(&self, key: Option<SessionKey>) -> Result<StatusSnapshot, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::GetStatus {
                key,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    async fn current_state(&self) -> AgentState {
        self.status(None)
            .await
            .map(|snapshot| snapshot.state)
            .unwrap_or_default()
    }

    /// Icon for the followed session. Idle if the actor is gone.
    pub async fn icon(&self) -> &'static str {
        state_icon(self.current_state().await)
    }

    /// Display color for the followed session. Idle if the actor is gone.
    pub async fn color(&self) -> &'static str {
        state_color(self.current_state().await)
    }

    /// Formatted status line for the followed session.
    pub async fn status_line(&self) -> String {
        match self.status(None).await {
            Ok(snapshot) => snapshot.status_line(),
            Err(_) => StatusSnapshot::idle(SessionKey::default_key()).status_line(),
        }
    }

    /// Forces an immediate reconciliation pass.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn reconcile(&self) -> Result<ReconcileReport, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Reconcile { respond_to: tx })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// All observed sessions, newest transition first.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn sessions(&self) -> Vec<SessionSummary> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::GetSessions { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Withdraws the alert and stops the actor.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor was already gone
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Shutdown { respond_to: tx })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Subscribe to session events.
    ///
    /// This is a synchronous operation - it doesn't communicate with the actor.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }

    /// Returns `true` while the command channel is open.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_handle() -> (RegistryHandle, mpsc::Receiver<RegistryCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, _event_rx) = broadcast::channel(16);
        (RegistryHandle::new(cmd_tx, event_tx), cmd_rx)
    }

    #[tokio::test]
    async fn test_status_sends_command() {
        let (handle, mut rx) = create_test_handle();

        let cmd_handler = tokio::spawn(async move {
            if let Some(RegistryCommand::GetStatus { key, respond_to }) = rx.recv().await {
                assert_eq!(key, Some(SessionKey::from("abc")));
                let _ = respond_to.send(StatusSnapshot::idle(SessionKey::from("abc")));
                return true;
            }
            false
        });

        let snapshot = handle.status(Some(SessionKey::from("abc"))).await.unwrap();
        assert_eq!(snapshot.state, AgentState::Idle);
        assert!(cmd_handler.await.unwrap());
    }

    #[tokio::test]
    async fn test_queries_degrade_to_idle_when_closed() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        assert!(matches!(
            handle.status(None).await,
            Err(RegistryError::ChannelClosed)
        ));
        assert_eq!(handle.icon().await, state_icon(AgentState::Idle));
        assert_eq!(handle.color().await, state_color(AgentState::Idle));
        assert_eq!(handle.status_line().await, "Claude: Idle");
        assert!(handle.sessions().await.is_empty());
        assert!(!handle.is_connected());
    }

    #[tokio::test]
    async fn test_files_changed_is_forwarded() {
        let (handle, mut rx) = create_test_handle();
        handle
            .files_changed(vec![PathBuf::from("/s/state.json")])
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(RegistryCommand::FilesChanged { paths }) if paths.len() == 1
        ));
    }

    #[tokio::test]
    async fn test_reconcile_channel_closed_error() {
        let (handle, rx) = create_test_handle();
        drop(rx);
        assert!(matches!(
            handle.reconcile().await,
            Err(RegistryError::ChannelClosed)
        ));
    }
}
