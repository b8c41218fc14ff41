//! hookstate core - shared types for Claude Code session state sync
//!
//! This crate provides the domain types and the on-disk state store shared
//! between the hook ingestor, the observer and the tmux alert propagator.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod display;
pub mod error;
pub mod hook;
pub mod ingest;
pub mod record;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use config::{AlertConfig, Config, TimingConfig, WatchStrategy};
pub use display::{state_color, state_icon, state_label, StatusSnapshot};
pub use error::{DomainError, DomainResult, StoreError, StoreResult};
pub use hook::{
    HookAction, HookEventType, HookPayload, DEFAULT_REFRESH_TOOLS, PERMISSION_PROMPT,
};
pub use ingest::{ingest, ingest_raw, IngestOutcome};
pub use record::StateRecord;
pub use session::{AgentState, SessionKey, DEFAULT_SESSION_KEY};
pub use store::{StateStore, StoreFile, StoredState};
