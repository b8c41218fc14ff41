//! Session registry using the Actor pattern.
//!
//! The registry owns the Observed State of every session in one state
//! directory. It is fed debounced change batches by the watcher and posts
//! its own timer expiries back into the same loop, so all state changes are
//! serialised.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  FilesChanged  ┌─────────────────┐  SessionEvent  ┌─────────────┐
//! │ Subscription │───────────────▶│  RegistryActor  │───────────────▶│ Subscribers │
//! └──────────────┘                │                 │                └─────────────┘
//!                  TimerFired     │  sessions       │  show/withdraw ┌─────────────┐
//!        timers ─────────────────▶│  reconciler     │───────────────▶│ AlertSink   │
//!                                 └─────────────────┘                └─────────────┘
//! ```

use std::sync::Arc;

use hookstate_core::StateStore;
use tokio::sync::{broadcast, mpsc};

use crate::alert::AlertSink;

mod actor;
mod commands;
mod handle;

pub use actor::{RegistryActor, RegistryOptions};
pub use commands::{
    ReconcileReport, RegistryCommand, RegistryError, SessionEvent, SessionSummary,
    TransitionCause,
};
pub use handle::RegistryHandle;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 64;

/// Spawns the registry actor and returns a handle for interaction.
///
/// The cold-start read of the store happens before this returns, so the
/// first status query already reflects whatever is on disk.
pub async fn spawn_registry(
    store: StateStore,
    options: RegistryOptions,
    alert: Option<Arc<dyn AlertSink>>,
) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let mut actor = RegistryActor::new(
        cmd_rx,
        cmd_tx.downgrade(),
        event_tx.clone(),
        store,
        options,
        alert,
    );
    actor.cold_start().await;
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx, event_tx)
}
