//! Buffer reconciliation driven by the refresh signal.
//!
//! The refresh signal says "files on disk changed, re-read them". It is kept
//! apart from the state pipeline: a session is marked pending when its
//! signal's modification time moves past the last value seen, and the
//! pending mark is only acted on when the session leaves `processing` or when
//! reconciliation is requested explicitly. Re-reading continuously while the
//! agent is still editing would make the editor flicker.

use std::collections::HashMap;
use std::time::SystemTime;

use hookstate_core::{SessionKey, StateStore};
use tracing::{debug, trace};

#[derive(Debug, Default, Clone, Copy)]
struct RefreshTracker {
    last_seen: Option<SystemTime>,
    pending: bool,
    tracking: bool,
}

#[derive(Debug)]
pub struct BufferReconciler {
    store: StateStore,
    trackers: HashMap<SessionKey, RefreshTracker>,
}

impl BufferReconciler {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            trackers: HashMap::new(),
        }
    }

    /// Accepts the session's current signal as already handled.
    pub fn prime(&mut self, key: &SessionKey) {
        let mtime = self.store.refresh_mtime(key);
        let tracker = self.trackers.entry(key.clone()).or_default();
        tracker.last_seen = mtime;
        tracker.pending = false;
    }

    /// Starts watching the session's signal. Returns true if that already
    /// found a new signal.
    pub fn begin_tracking(&mut self, key: &SessionKey) -> bool {
        self.trackers.entry(key.clone()).or_default().tracking = true;
        trace!(session_key = %key, "Refresh tracking started");
        self.check(key)
    }

    pub fn stop_tracking(&mut self, key: &SessionKey) {
        if let Some(tracker) = self.trackers.get_mut(key) {
            tracker.tracking = false;
        }
    }

    pub fn is_tracking(&self, key: &SessionKey) -> bool {
        self.trackers.get(key).is_some_and(|t| t.tracking)
    }

    pub fn is_pending(&self, key: &SessionKey) -> bool {
        self.trackers.get(key).is_some_and(|t| t.pending)
    }

    /// Looks at the signal file. Returns true if this marked the session
    /// pending; a signal that is missing or not newer than the last one seen
    /// is no signal.
    pub fn check(&mut self, key: &SessionKey) -> bool {
        let Some(mtime) = self.store.refresh_mtime(key) else {
            return false;
        };
        let tracker = self.trackers.entry(key.clone()).or_default();
        if tracker.last_seen.is_some_and(|seen| mtime <= seen) {
            return false;
        }
        tracker.last_seen = Some(mtime);
        let newly_pending = !tracker.pending;
        tracker.pending = true;
        if newly_pending {
            debug!(session_key = %key, "Refresh pending");
        }
        newly_pending
    }

    /// Checks every tracked session; returns the ones that became pending.
    pub fn check_tracked(&mut self) -> Vec<SessionKey> {
        let tracked: Vec<SessionKey> = self
            .trackers
            .iter()
            .filter(|(_, t)| t.tracking)
            .map(|(key, _)| key.clone())
            .collect();
        tracked.into_iter().filter(|key| self.check(key)).collect()
    }

    /// Runs one reconciliation pass for the session.
    ///
    /// Returns true if there was a pending refresh, which the caller turns
    /// into a single "re-read buffers" signal. Calling it again without a new
    /// signal returns false.
    pub fn reconcile(&mut self, key: &SessionKey) -> bool {
        self.check(key);
        let Some(tracker) = self.trackers.get_mut(key) else {
            return false;
        };
        let was_pending = std::mem::take(&mut tracker.pending);
        if was_pending {
            debug!(session_key = %key, "Buffers reconciled");
        }
        was_pending
    }

    pub fn forget(&mut self, key: &SessionKey) {
        self.trackers.remove(key);
    }
}
