//! Per-session timers that force a stale state back to idle.
//!
//! A timer is a sleeping task that posts a message back into the registry
//! loop when it expires. The handle owns the task: dropping or replacing it
//! cancels the timer, so a session can never hold two timers of one kind
//! and a removed session cannot be touched by a late timer.
//!
//! Each handle carries a generation number. A timer that already fired and
//! queued its message before being replaced is recognised by the stale
//! generation and ignored.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use hookstate_core::AgentState;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Clears a transient `done`.
    Completion,
    /// Gives up on a `waiting` nobody answered.
    Recovery,
}

impl TimerKind {
    /// The state this timer is armed for.
    pub fn armed_state(&self) -> AgentState {
        match self {
            Self::Completion => AgentState::Done,
            Self::Recovery => AgentState::Waiting,
        }
    }

    /// The timer a state arms, if any.
    pub fn for_state(state: AgentState) -> Option<Self> {
        match state {
            AgentState::Done => Some(Self::Completion),
            AgentState::Waiting => Some(Self::Recovery),
            AgentState::Idle | AgentState::Processing => None,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion => write!(f, "completion"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

#[derive(Debug)]
pub struct TimerHandle {
    kind: TimerKind,
    generation: u64,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Spawns a timer that runs `on_expiry` after `after`.
    pub fn arm<F>(kind: TimerKind, generation: u64, after: Duration, on_expiry: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + after;
        let task = tokio::spawn(async move {
            sleep_until(deadline).await;
            on_expiry.await;
        });
        Self {
            kind,
            generation,
            task,
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The timers owned by one observed session.
#[derive(Debug, Default)]
pub struct SessionTimers {
    completion: Option<TimerHandle>,
    recovery: Option<TimerHandle>,
}

impl SessionTimers {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::Completion => &mut self.completion,
            TimerKind::Recovery => &mut self.recovery,
        }
    }

    /// Installs `timer`, cancelling any timer of the same kind.
    pub fn replace(&mut self, timer: TimerHandle) {
        let kind = timer.kind();
        *self.slot(kind) = Some(timer);
    }

    pub fn cancel_all(&mut self) {
        self.completion = None;
        self.recovery = None;
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Completion => self.completion.is_some(),
            TimerKind::Recovery => self.recovery.is_some(),
        }
    }

    /// Consumes the timer of `kind` if it is the one with `generation`.
    ///
    /// Returns false for a stale expiry from a replaced timer.
    pub fn take_expired(&mut self, kind: TimerKind, generation: u64) -> bool {
        let slot = self.slot(kind);
        if slot.as_ref().is_some_and(|t| t.generation() == generation) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::advance;

    fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let _timer = TimerHandle::arm(
            TimerKind::Completion,
            1,
            Duration::from_millis(2_000),
            counting(&fired),
        );

        advance(Duration::from_millis(1_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_cancels_instead_of_stacking() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timers = SessionTimers::default();

        timers.replace(TimerHandle::arm(
            TimerKind::Recovery,
            1,
            Duration::from_secs(60),
            counting(&fired),
        ));
        advance(Duration::from_secs(30)).await;
        timers.replace(TimerHandle::arm(
            TimerKind::Recovery,
            2,
            Duration::from_secs(60),
            counting(&fired),
        ));

        advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0, "first timer must be cancelled");

        advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_expired_rejects_stale_generation() {
        let mut timers = SessionTimers::default();
        timers.replace(TimerHandle::arm(
            TimerKind::Completion,
            7,
            Duration::from_secs(2),
            async {},
        ));

        assert!(!timers.take_expired(TimerKind::Completion, 6));
        assert!(timers.is_armed(TimerKind::Completion));
        assert!(timers.take_expired(TimerKind::Completion, 7));
        assert!(!timers.is_armed(TimerKind::Completion));
    }

    #[test]
    fn test_kind_state_mapping() {
        assert_eq!(TimerKind::for_state(AgentState::Done), Some(TimerKind::Completion));
        assert_eq!(TimerKind::for_state(AgentState::Waiting), Some(TimerKind::Recovery));
        assert_eq!(TimerKind::for_state(AgentState::Processing), None);
        assert_eq!(TimerKind::Recovery.armed_state(), AgentState::Waiting);
    }
}
