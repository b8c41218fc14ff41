//! Registry actor - owns all observed session state and processes commands.
//!
//! The actor is the single owner of the Observed State cache. Everything that
//! mutates it (debounced file changes, timer expiries, explicit reconcile)
//! arrives as a `RegistryCommand` and is handled sequentially, so no locking
//! is needed.
//!
//! # State machine
//!
//! Transitions are driven only by the latest observed state record:
//!
//! ```text
//! idle ─▶ processing ─▶ waiting ─▶ processing ─▶ done ─▶ idle
//!                          │                      │
//!                          └── recovery timer ──▶ idle ◀── completion timer
//! ```
//!
//! Entering `done` arms the completion timer, entering `waiting` arms the
//! recovery timer. Either forces `idle` on expiry if the session has not
//! moved on. A removed state file resets the session to `idle` and cancels
//! its timers.
//!
//! # Panic-Free Guarantees
//!
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()` or `todo!()`.
//! Reply send failures (caller went away) are ignored.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use hookstate_core::{
    AgentState, Config, SessionKey, StateRecord, StateStore, StatusSnapshot, StoredState,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use super::commands::{
    ReconcileReport, RegistryCommand, SessionEvent, SessionSummary, TransitionCause,
};
use crate::alert::AlertSink;
use crate::reconciler::BufferReconciler;
use crate::timer::{SessionTimers, TimerHandle, TimerKind};

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// How long `done` is shown before falling back to `idle`.
    pub completion: Duration,
    /// How long `waiting` may last without news.
    pub recovery: Duration,
    /// Session to follow. `None` follows the most recently written one.
    pub follow: Option<SessionKey>,
}

impl RegistryOptions {
    pub fn from_config(config: &Config, follow: Option<SessionKey>) -> Self {
        Self {
            completion: config.timing.completion(),
            recovery: config.timing.recovery(),
            follow,
        }
    }

    fn timeout(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::Completion => self.completion,
            TimerKind::Recovery => self.recovery,
        }
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), None)
    }
}

// ============================================================================
// Observed State
// ============================================================================

/// In-memory view of one session. Never written back to disk.
#[derive(Debug)]
struct ObservedSession {
    state: AgentState,
    last_transition: DateTime<Utc>,
    /// Modification time and content of the record last applied.
    applied: Option<(SystemTime, StateRecord)>,
    timers: SessionTimers,
}

impl ObservedSession {
    fn new() -> Self {
        Self {
            state: AgentState::Idle,
            last_transition: Utc::now(),
            applied: None,
            timers: SessionTimers::default(),
        }
    }
}

// ============================================================================
// Registry Actor
// ============================================================================

pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Weak sender handed to timers so they do not keep the actor alive
    timer_sender: mpsc::WeakSender<RegistryCommand>,

    /// Event publisher for subscribers
    event_publisher: broadcast::Sender<SessionEvent>,

    store: StateStore,
    options: RegistryOptions,
    sessions: HashMap<SessionKey, ObservedSession>,

    /// Session whose state drives the alert and the default status.
    current: Option<SessionKey>,

    reconciler: BufferReconciler,
    alert: Option<Arc<dyn AlertSink>>,
    next_generation: u64,
}

impl RegistryActor {
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        timer_sender: mpsc::WeakSender<RegistryCommand>,
        event_publisher: broadcast::Sender<SessionEvent>,
        store: StateStore,
        options: RegistryOptions,
        alert: Option<Arc<dyn AlertSink>>,
    ) -> Self {
        let reconciler = BufferReconciler::new(store.clone());
        Self {
            receiver,
            timer_sender,
            event_publisher,
            store,
            options,
            sessions: HashMap::new(),
            current: None,
            reconciler,
            alert,
            next_generation: 0,
        }
    }

    /// Reads every existing state file once before any change is watched.
    ///
    /// Refresh signals already on disk count as handled, and the alert is
    /// brought in line with the followed session (clearing a stale one left
    /// by a previous run).
    pub async fn cold_start(&mut self) {
        if let Ok(scanned) = self.store.scan() {
            for stored in &scanned {
                self.reconciler.prime(&stored.key);
            }
        }
        self.sync().await;

        let state = self.current_state();
        if let Some(alert) = &self.alert {
            alert.show(state).await;
        }
        info!(
            sessions = self.sessions.len(),
            current = ?self.current.as_ref().map(SessionKey::as_str),
            state = %state,
            "Cold start reconciliation complete"
        );
    }

    /// Runs the actor event loop until the channel closes or a shutdown
    /// command arrives.
    pub async fn run(mut self) {
        info!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            if !self.handle_command(cmd).await {
                break;
            }
        }

        info!(sessions = self.sessions.len(), "Registry actor stopped");
    }

    /// Dispatches a command. Returns false when the actor should stop.
    async fn handle_command(&mut self, cmd: RegistryCommand) -> bool {
        match cmd {
            RegistryCommand::FilesChanged { paths } => {
                trace!(count = paths.len(), "Store files changed");
                self.sync().await;
            }
            RegistryCommand::Reconcile { respond_to } => {
                let report = self.handle_reconcile().await;
                let _ = respond_to.send(report);
            }
            RegistryCommand::TimerFired {
                key,
                kind,
                generation,
            } => {
                self.handle_timer_fired(key, kind, generation).await;
            }
            RegistryCommand::GetStatus { key, respond_to } => {
                let _ = respond_to.send(self.handle_get_status(key));
            }
            RegistryCommand::GetSessions { respond_to } => {
                let _ = respond_to.send(self.handle_get_sessions());
            }
            RegistryCommand::Shutdown { respond_to } => {
                if let Some(alert) = &self.alert {
                    alert.withdraw().await;
                }
                for session in self.sessions.values_mut() {
                    session.timers.cancel_all();
                }
                let _ = respond_to.send(());
                return false;
            }
        }
        true
    }

    // ========================================================================
    // Store synchronisation
    // ========================================================================

    /// Re-reads the store and brings the Observed State in line with it.
    async fn sync(&mut self) {
        let scanned = match self.store.scan() {
            Ok(scanned) => scanned,
            Err(e) => {
                warn!(error = %e, "Failed to scan state directory");
                return;
            }
        };

        for stored in &scanned {
            self.observe(stored).await;
        }

        let present: HashSet<&SessionKey> = scanned.iter().map(|s| &s.key).collect();
        let gone: Vec<SessionKey> = self
            .sessions
            .keys()
            .filter(|key| !present.contains(key))
            .cloned()
            .collect();
        for key in gone {
            self.remove_session(&key).await;
        }

        let current = match &self.options.follow {
            Some(key) => Some(key.clone()),
            None => self.most_recent(&scanned),
        };
        self.set_current(current).await;

        for key in self.reconciler.check_tracked() {
            self.publish(SessionEvent::RefreshPending { key });
        }
    }

    /// Most recently written session with a usable record.
    ///
    /// A corrupt file only counts if its session is already known, so a bad
    /// write cannot steal the focus.
    fn most_recent(&self, scanned: &[StoredState]) -> Option<SessionKey> {
        let usable: Vec<StoredState> = scanned
            .iter()
            .filter(|s| s.record.is_some() || self.sessions.contains_key(&s.key))
            .cloned()
            .collect();
        StateStore::most_recent(&usable).map(|s| s.key.clone())
    }

    async fn observe(&mut self, stored: &StoredState) {
        let Some(record) = &stored.record else {
            debug!(
                session_key = %stored.key,
                path = %stored.path.display(),
                "Unreadable state record, keeping previous state"
            );
            return;
        };

        let session = self
            .sessions
            .entry(stored.key.clone())
            .or_insert_with(ObservedSession::new);
        let fingerprint = (stored.modified, record.clone());
        if session.applied.as_ref() == Some(&fingerprint) {
            return;
        }
        session.applied = Some(fingerprint);

        self.transition(&stored.key, record.state, TransitionCause::Record)
            .await;
    }

    async fn remove_session(&mut self, key: &SessionKey) {
        if self.sessions.contains_key(key) {
            self.transition(key, AgentState::Idle, TransitionCause::Removed)
                .await;
        }
        // Dropping the session drops its timers, which cancels them.
        self.sessions.remove(key);
        self.reconciler.forget(key);
        info!(session_key = %key, "Session removed");
    }

    async fn set_current(&mut self, current: Option<SessionKey>) {
        if current == self.current {
            return;
        }
        debug!(
            from = ?self.current.as_ref().map(SessionKey::as_str),
            to = ?current.as_ref().map(SessionKey::as_str),
            "Followed session changed"
        );
        self.current = current.clone();
        self.publish(SessionEvent::CurrentChanged { key: current });

        let state = self.current_state();
        if let Some(alert) = &self.alert {
            alert.show(state).await;
        }
    }

    fn current_state(&self) -> AgentState {
        self.current
            .as_ref()
            .and_then(|key| self.sessions.get(key))
            .map(|s| s.state)
            .unwrap_or_default()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Moves a session to `to` and runs the side effects.
    ///
    /// Re-entering the same state (a fresh record with the same state)
    /// re-arms its timer but is not a transition.
    async fn transition(&mut self, key: &SessionKey, to: AgentState, cause: TransitionCause) {
        if !self.sessions.contains_key(key) {
            return;
        }
        let timer = TimerKind::for_state(to).map(|kind| self.arm_timer(key, kind));

        let Some(session) = self.sessions.get_mut(key) else {
            return;
        };
        session.timers.cancel_all();
        if let Some(timer) = timer {
            session.timers.replace(timer);
        }

        let from = session.state;
        if from == to {
            trace!(session_key = %key, state = %to, "State unchanged");
            return;
        }
        session.state = to;
        session.last_transition = Utc::now();

        info!(session_key = %key, from = %from, to = %to, cause = %cause, "State transition");
        self.publish(SessionEvent::StateChanged {
            key: key.clone(),
            from,
            to,
            cause,
        });

        if self.current.as_ref() == Some(key) {
            if let Some(alert) = &self.alert {
                alert.show(to).await;
            }
        }

        if to.is_processing() && !from.is_processing() {
            if self.reconciler.begin_tracking(key) {
                self.publish(SessionEvent::RefreshPending { key: key.clone() });
            }
        } else if from.is_processing() && !to.is_processing() {
            self.reconciler.stop_tracking(key);
            if self.reconciler.reconcile(key) {
                self.publish(SessionEvent::BuffersReconciled { key: key.clone() });
            }
        }
    }

    fn arm_timer(&mut self, key: &SessionKey, kind: TimerKind) -> TimerHandle {
        self.next_generation += 1;
        let generation = self.next_generation;
        let sender = self.timer_sender.clone();
        let fired = RegistryCommand::TimerFired {
            key: key.clone(),
            kind,
            generation,
        };
        trace!(session_key = %key, timer = %kind, generation, "Timer armed");

        TimerHandle::arm(kind, generation, self.options.timeout(kind), async move {
            if let Some(sender) = sender.upgrade() {
                let _ = sender.send(fired).await;
            }
        })
    }

    async fn handle_timer_fired(&mut self, key: SessionKey, kind: TimerKind, generation: u64) {
        let Some(session) = self.sessions.get_mut(&key) else {
            trace!(session_key = %key, timer = %kind, "Timer for removed session ignored");
            return;
        };
        if !session.timers.take_expired(kind, generation) {
            trace!(session_key = %key, timer = %kind, generation, "Stale timer ignored");
            return;
        }
        if session.state != kind.armed_state() {
            return;
        }

        info!(session_key = %key, timer = %kind, "Timer expired, forcing idle");
        self.transition(&key, AgentState::Idle, kind.into()).await;
    }

    // ========================================================================
    // Queries and explicit reconcile
    // ========================================================================

    async fn handle_reconcile(&mut self) -> ReconcileReport {
        self.sync().await;

        let mut keys: Vec<SessionKey> = self.sessions.keys().cloned().collect();
        keys.sort();
        let mut reconciled = Vec::new();
        for key in keys {
            if self.reconciler.reconcile(&key) {
                self.publish(SessionEvent::BuffersReconciled { key: key.clone() });
                reconciled.push(key);
            }
        }

        debug!(reconciled = reconciled.len(), "Explicit reconciliation pass");
        ReconcileReport {
            sessions: self.sessions.len(),
            reconciled,
        }
    }

    fn handle_get_status(&self, key: Option<SessionKey>) -> StatusSnapshot {
        let key = key
            .or_else(|| self.current.clone())
            .unwrap_or_default();
        match self.sessions.get(&key) {
            Some(session) => StatusSnapshot::new(key, session.state, session.last_transition),
            None => StatusSnapshot::idle(key),
        }
    }

    fn handle_get_sessions(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|(key, s)| SessionSummary {
                key: key.clone(),
                state: s.state,
                last_transition: s.last_transition,
            })
            .collect();
        sessions.sort_by(|a, b| {
            b.last_transition
                .cmp(&a.last_transition)
                .then_with(|| a.key.cmp(&b.key))
        });
        sessions
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_publisher.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn actor_for(store: StateStore) -> (RegistryActor, mpsc::Sender<RegistryCommand>) {
        let (tx, rx) = mpsc::channel(16);
        let (events, _) = broadcast::channel(16);
        let actor = RegistryActor::new(
            rx,
            tx.downgrade(),
            events,
            store,
            RegistryOptions::default(),
            None,
        );
        (actor, tx)
    }

    #[tokio::test]
    async fn test_corrupt_record_keeps_previous_state() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path());
        let key = SessionKey::from("k");
        store
            .write_state(&StateRecord::now(AgentState::Processing, key.clone()))
            .unwrap();

        let (mut actor, _tx) = actor_for(store.clone());
        actor.cold_start().await;
        assert_eq!(actor.current_state(), AgentState::Processing);

        std::fs::write(store.state_path(&key), "{\"state\":").unwrap();
        actor.sync().await;
        assert_eq!(actor.handle_get_status(Some(key)).state, AgentState::Processing);
    }

    #[tokio::test]
    async fn test_same_record_is_applied_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path());
        store
            .write_state(&StateRecord::now(AgentState::Done, SessionKey::default_key()))
            .unwrap();

        let (mut actor, _tx) = actor_for(store);
        let mut events = actor.event_publisher.subscribe();
        actor.cold_start().await;
        actor.sync().await;
        actor.sync().await;

        let mut transitions = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::StateChanged { .. }) {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let tmp = tempfile::tempdir().unwrap();
        let (actor, tx) = actor_for(StateStore::new(tmp.path()));
        let task = tokio::spawn(actor.run());

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(RegistryCommand::Shutdown {
            respond_to: reply_tx,
        })
        .await
        .unwrap();
        reply_rx.await.unwrap();
        task.await.unwrap();
    }

    #[test]
    fn test_options_from_config() {
        let options = RegistryOptions::from_config(&Config::default(), Some(SessionKey::from("x")));
        assert_eq!(options.completion, Duration::from_millis(2_000));
        assert_eq!(options.recovery, Duration::from_millis(60_000));
        assert_eq!(options.timeout(TimerKind::Recovery), options.recovery);
    }
}
