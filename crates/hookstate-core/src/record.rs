//! The on-disk state record.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{AgentState, DomainError, DomainResult, SessionKey};

/// Current lifecycle state of one session, as written by the ingestor.
///
/// One file per session key, always overwritten whole. Readers ignore
/// unknown fields so newer writers can add to the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: AgentState,
    #[serde(default)]
    pub session_key: SessionKey,
    /// Unix seconds at write time.
    #[serde(default)]
    pub timestamp: i64,
}

impl StateRecord {
    /// Creates a record stamped with the current time.
    pub fn now(state: AgentState, session_key: SessionKey) -> Self {
        Self {
            state,
            session_key,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Parses record content.
    ///
    /// Empty content is an error rather than a default record: a reader that
    /// races a writer must not mistake a truncated file for `idle`.
    pub fn parse(content: &str) -> DomainResult<Self> {
        if content.trim().is_empty() {
            return Err(DomainError::ParseError {
                field: "state record".to_string(),
                reason: "empty file".to_string(),
            });
        }
        serde_json::from_str(content).map_err(|e| DomainError::parse("state record", e))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
