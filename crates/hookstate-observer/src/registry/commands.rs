//! Registry actor commands, errors, and events.
//!
//! - `RegistryCommand`: messages processed by the actor loop, including the
//!   ones its own timers post back
//! - `RegistryError`: failures talking to the actor
//! - `SessionEvent`: notifications broadcast to subscribers

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use hookstate_core::{AgentState, SessionKey, StatusSnapshot};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::timer::TimerKind;

// ============================================================================
// Registry Commands
// ============================================================================

#[derive(Debug)]
pub enum RegistryCommand {
    /// Store files changed on disk (one debounced batch).
    FilesChanged { paths: Vec<PathBuf> },

    /// Re-read the store and run a buffer reconciliation pass now.
    Reconcile {
        respond_to: oneshot::Sender<ReconcileReport>,
    },

    /// A session timer expired.
    TimerFired {
        key: SessionKey,
        kind: TimerKind,
        generation: u64,
    },

    /// Status of one session, or of the followed session when `key` is `None`.
    GetStatus {
        key: Option<SessionKey>,
        respond_to: oneshot::Sender<StatusSnapshot>,
    },

    /// All observed sessions, newest transition first.
    GetSessions {
        respond_to: oneshot::Sender<Vec<SessionSummary>>,
    },

    /// Withdraw the alert and stop the actor.
    Shutdown { respond_to: oneshot::Sender<()> },
}

// ============================================================================
// Registry Errors
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The actor is gone (shut down or its task ended).
    #[error("registry channel closed")]
    ChannelClosed,
}

// ============================================================================
// Replies
// ============================================================================

/// One observed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub state: AgentState,
    pub last_transition: DateTime<Utc>,
}

/// Outcome of an explicit reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sessions observed after re-reading the store.
    pub sessions: usize,
    /// Sessions whose buffers had a pending refresh.
    pub reconciled: Vec<SessionKey>,
}

// ============================================================================
// Session Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// A new state record was observed.
    Record,
    /// The `done` display window elapsed.
    CompletionTimer,
    /// Nobody answered a `waiting` session in time.
    RecoveryTimer,
    /// The session's state file disappeared.
    Removed,
}

impl From<TimerKind> for TransitionCause {
    fn from(kind: TimerKind) -> Self {
        match kind {
            TimerKind::Completion => Self::CompletionTimer,
            TimerKind::Recovery => Self::RecoveryTimer,
        }
    }
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record => write!(f, "state record"),
            Self::CompletionTimer => write!(f, "completion timer"),
            Self::RecoveryTimer => write!(f, "recovery timer"),
            Self::Removed => write!(f, "session removed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session changed state.
    StateChanged {
        key: SessionKey,
        from: AgentState,
        to: AgentState,
        cause: TransitionCause,
    },

    /// The followed session switched to another key (or to none).
    CurrentChanged { key: Option<SessionKey> },

    /// A session's refresh signal advanced while it was being tracked.
    RefreshPending { key: SessionKey },

    /// Re-read files from disk now.
    BuffersReconciled { key: SessionKey },
}
