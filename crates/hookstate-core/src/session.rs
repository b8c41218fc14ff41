//! Session identity and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

// ============================================================================
// Session Key
// ============================================================================

/// Key used when the external process supplies no session identifier.
pub const DEFAULT_SESSION_KEY: &str = "default";

/// Maximum length of a sanitised session key.
pub const MAX_KEY_LEN: usize = 64;

/// Identifier namespacing one logical session's on-disk artifacts.
///
/// Derived from the external session identifier (e.g. a Claude Code
/// `session_id` UUID). Characters outside `[A-Za-z0-9_-]` are replaced with
/// `_` so the key is always safe to embed in a filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derives a key from an optional external session identifier.
    ///
    /// Missing, empty or all-whitespace identifiers yield the default key.
    pub fn derive(session_id: Option<&str>) -> Self {
        match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::sanitize(id),
            _ => Self::default_key(),
        }
    }

    /// The fixed key used when no session identifier is available.
    pub fn default_key() -> Self {
        Self(DEFAULT_SESSION_KEY.to_string())
    }

    fn sanitize(raw: &str) -> Self {
        let cleaned: String = raw
            .chars()
            .take(MAX_KEY_LEN)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self(cleaned)
    }

    /// Returns true if this is the default (identifier-less) key.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_SESSION_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened display form (first 8 characters).
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::default_key()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self::derive(Some(s))
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self::derive(Some(&s))
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Agent State
// ============================================================================

/// Lifecycle state of one external CLI session.
///
/// Cycles `idle → processing → waiting → done → idle`, with
/// `waiting → processing` reachable directly when an approval is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Nothing happening; the CLI is waiting for the next prompt.
    #[default]
    Idle,

    /// The CLI is working on a prompt.
    Processing,

    /// The CLI is blocked on a user approval.
    Waiting,

    /// The CLI just finished a turn. Transient.
    Done,
}

impl AgentState {
    pub const ALL: [AgentState; 4] = [Self::Idle, Self::Processing, Self::Waiting, Self::Done];

    /// Lowercase wire name, as written into state records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Waiting => "waiting",
            Self::Done => "done",
        }
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "idle" => Ok(Self::Idle),
            "processing" => Ok(Self::Processing),
            "waiting" => Ok(Self::Waiting),
            "done" => Ok(Self::Done),
            other => Err(DomainError::InvalidFieldValue {
                field: "state".to_string(),
                value: other.to_string(),
                expected: "idle|processing|waiting|done".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_missing_id_uses_default() {
        assert!(SessionKey::derive(None).is_default());
        assert!(SessionKey::derive(Some("")).is_default());
        assert!(SessionKey::derive(Some("   ")).is_default());
    }

    #[test]
    fn test_derive_keeps_uuid() {
        let key = SessionKey::derive(Some("8e11bfb5-7dc2-432b-9206-928fa5c35731"));
        assert_eq!(key.as_str(), "8e11bfb5-7dc2-432b-9206-928fa5c35731");
        assert_eq!(key.short(), "8e11bfb5");
    }

    #[test]
    fn test_derive_replaces_path_separators() {
        let key = SessionKey::derive(Some("../etc/passwd"));
        assert_eq!(key.as_str(), "___etc_passwd");
    }

    #[test]
    fn test_derive_truncates_long_ids() {
        let long = "a".repeat(200);
        assert_eq!(SessionKey::derive(Some(&long)).as_str().len(), MAX_KEY_LEN);
    }

    #[test]
    fn test_state_parse_and_display() {
        for state in AgentState::ALL {
            assert_eq!(state.as_str().parse::<AgentState>().unwrap(), state);
        }
        assert!("compacting".parse::<AgentState>().is_err());
    }

    #[test]
    fn test_state_serde_snake_case() {
        let json = serde_json::to_string(&AgentState::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
