//! hookstate observer - the consumer side of the state store
//!
//! Watches a state directory, keeps one state machine per session, and
//! propagates transitions to subscribers, the tmux alert and the buffer
//! reconciler.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod alert;
pub mod debounce;
pub mod error;
pub mod observer;
pub mod reconciler;
pub mod registry;
pub mod timer;
pub mod watcher;

pub use alert::AlertSink;
pub use debounce::{ChangeBatch, Debouncer};
pub use error::{WatchError, WatchResult};
pub use observer::Observer;
pub use reconciler::BufferReconciler;
pub use registry::{
    spawn_registry, ReconcileReport, RegistryError, RegistryHandle, RegistryOptions,
    SessionEvent, SessionSummary, TransitionCause,
};
pub use timer::{TimerHandle, TimerKind};
pub use watcher::{subscribe, MtimePoller, SubscribeOptions, Subscription};
