//! Event ingestion: one hook payload in, at most one store mutation out.
//!
//! Every invocation is independent. There is no read-modify-write and no
//! sequence number, so two near-simultaneous invocations resolve as
//! last-write-wins on the state file's modification time.

use tracing::{debug, info};

use crate::{HookAction, HookPayload, SessionKey, StateRecord, StateStore, StoreResult};

/// What an ingestion actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Written {
        key: SessionKey,
        record: StateRecord,
        refreshed: bool,
    },
    Cleaned {
        key: SessionKey,
        removed: bool,
    },
    Skipped,
}

/// Applies one parsed hook payload to the store.
pub fn ingest<S: AsRef<str>>(
    payload: &HookPayload,
    store: &StateStore,
    refresh_tools: &[S],
) -> StoreResult<IngestOutcome> {
    let key = payload.session_key();

    match payload.action(refresh_tools) {
        HookAction::Write { state, refresh } => {
            let record = StateRecord::now(state, key.clone());
            store.write_state(&record)?;
            if refresh {
                store.touch_refresh(&key)?;
            }
            debug!(
                session_key = %key,
                event = %payload.hook_event_name,
                state = %state,
                refresh,
                "Hook event ingested"
            );
            Ok(IngestOutcome::Written {
                key,
                record,
                refreshed: refresh,
            })
        }
        HookAction::Cleanup => {
            let removed = store.delete_session(&key)?;
            info!(session_key = %key, removed, "Session files cleaned up");
            Ok(IngestOutcome::Cleaned { key, removed })
        }
        HookAction::Ignore => {
            debug!(
                event = %payload.hook_event_name,
                notification_type = ?payload.notification_type,
                "Hook event ignored"
            );
            Ok(IngestOutcome::Skipped)
        }
    }
}

/// Parses raw stdin content and ingests it.
///
/// Malformed input is reported as `Ok(None)` after logging: the caller must
/// not treat it as a store failure.
pub fn ingest_raw<S: AsRef<str>>(
    input: &str,
    store: &StateStore,
    refresh_tools: &[S],
) -> StoreResult<Option<IngestOutcome>> {
    match HookPayload::parse_lenient(input) {
        Some(payload) => ingest(&payload, store, refresh_tools).map(Some),
        None => Ok(None),
    }
}
