//! hookstate tmux - window alerts for session state
//!
//! Decorates the consumer's tmux window while a session is processing,
//! waiting for approval or done, and clears the decoration again.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod alert;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod multiplexer;

pub use alert::{alert_format, focus_hook_command, AlertPropagator};
pub use error::{TmuxError, TmuxResult};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockMultiplexer;
pub use multiplexer::{is_in_tmux, HookScope, Multiplexer, TmuxCli};
