//! Hook events from Claude Code and the action each one maps to.
//!
//! ```text
//! SessionStart                           → idle
//! UserPromptSubmit / PreToolUse          → processing
//! PostToolUse                            → processing (+ refresh signal for editing tools)
//! PreCompact                             → processing
//! PermissionRequest                      → waiting
//! Notification (permission_prompt)       → waiting
//! Notification (any other type)          → no-op
//! Stop                                   → done
//! SubagentStop                           → no-op
//! SessionEnd                             → delete session files
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::{AgentState, DomainError, DomainResult, SessionKey};

/// Notification sub-type meaning "the CLI needs the user's approval".
pub const PERMISSION_PROMPT: &str = "permission_prompt";

/// Tools whose completion means files on disk were changed.
pub const DEFAULT_REFRESH_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit", "NotebookEdit"];

/// Types of hook events from Claude Code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEventType {
    SessionStart,
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    PreCompact,
    PermissionRequest,
    Notification,
    Stop,
    SubagentStop,
    SessionEnd,
}

impl HookEventType {
    /// All event names the ingestor should be registered for.
    pub const ALL: [HookEventType; 10] = [
        Self::SessionStart,
        Self::UserPromptSubmit,
        Self::PreToolUse,
        Self::PostToolUse,
        Self::PreCompact,
        Self::PermissionRequest,
        Self::Notification,
        Self::Stop,
        Self::SubagentStop,
        Self::SessionEnd,
    ];

    /// Parses from a hook event name string.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "SessionStart" => Some(Self::SessionStart),
            "UserPromptSubmit" => Some(Self::UserPromptSubmit),
            "PreToolUse" => Some(Self::PreToolUse),
            "PostToolUse" => Some(Self::PostToolUse),
            "PreCompact" => Some(Self::PreCompact),
            "PermissionRequest" => Some(Self::PermissionRequest),
            "Notification" => Some(Self::Notification),
            "Stop" => Some(Self::Stop),
            "SubagentStop" => Some(Self::SubagentStop),
            "SessionEnd" => Some(Self::SessionEnd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::PreCompact => "PreCompact",
            Self::PermissionRequest => "PermissionRequest",
            Self::Notification => "Notification",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::SessionEnd => "SessionEnd",
        }
    }

    /// Returns true if hook configuration for this event filters by tool name.
    #[must_use]
    pub fn uses_tool_matcher(&self) -> bool {
        matches!(
            self,
            Self::PreToolUse | Self::PostToolUse | Self::PermissionRequest
        )
    }
}

impl fmt::Display for HookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw hook payload read from the ingestor's stdin.
///
/// Only the event name is required. The short aliases (`event`,
/// `qualifier`, `tool`) are accepted alongside Claude Code's own names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookPayload {
    #[serde(alias = "event")]
    pub hook_event_name: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, alias = "qualifier")]
    pub notification_type: Option<String>,
    #[serde(default, alias = "tool")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

/// What the ingestor does with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Overwrite the session's state record, optionally touching the refresh signal too.
    Write { state: AgentState, refresh: bool },
    /// Delete the session's state record and refresh signal.
    Cleanup,
    /// Nothing to do for this event.
    Ignore,
}

impl HookPayload {
    /// Parses a payload from the raw stdin content.
    pub fn parse(input: &str) -> DomainResult<Self> {
        serde_json::from_str(input).map_err(|e| DomainError::parse("hook payload", e))
    }

    /// Parses stdin content, logging and discarding empty or malformed input.
    pub fn parse_lenient(input: &str) -> Option<Self> {
        if input.trim().is_empty() {
            debug!("Empty hook payload");
            return None;
        }
        match Self::parse(input) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(error = %e, "Skipping malformed hook payload");
                None
            }
        }
    }

    pub fn event_type(&self) -> Option<HookEventType> {
        HookEventType::from_event_name(&self.hook_event_name)
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::derive(self.session_id.as_deref())
    }

    /// Maps this event to exactly one ingestor action.
    ///
    /// `refresh_tools` lists the tool names whose `PostToolUse` also writes
    /// the refresh signal.
    pub fn action<S: AsRef<str>>(&self, refresh_tools: &[S]) -> HookAction {
        let Some(event) = self.event_type() else {
            return HookAction::Ignore;
        };

        match event {
            HookEventType::SessionStart => write(AgentState::Idle),
            HookEventType::UserPromptSubmit
            | HookEventType::PreToolUse
            | HookEventType::PreCompact => write(AgentState::Processing),
            HookEventType::PostToolUse => {
                let refresh = self
                    .tool_name
                    .as_deref()
                    .is_some_and(|tool| refresh_tools.iter().any(|t| t.as_ref() == tool));
                HookAction::Write {
                    state: AgentState::Processing,
                    refresh,
                }
            }
            HookEventType::PermissionRequest => write(AgentState::Waiting),
            HookEventType::Notification => {
                if self.notification_type.as_deref() == Some(PERMISSION_PROMPT) {
                    write(AgentState::Waiting)
                } else {
                    HookAction::Ignore
                }
            }
            HookEventType::Stop => write(AgentState::Done),
            HookEventType::SubagentStop => HookAction::Ignore,
            HookEventType::SessionEnd => HookAction::Cleanup,
        }
    }
}

fn write(state: AgentState) -> HookAction {
    HookAction::Write {
        state,
        refresh: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> HookPayload {
        HookPayload::parse(json).unwrap()
    }

    fn action(json: &str) -> HookAction {
        payload(json).action(DEFAULT_REFRESH_TOOLS)
    }

    #[test]
    fn test_hook_event_parsing() {
        assert_eq!(
            HookEventType::from_event_name("PreToolUse"),
            Some(HookEventType::PreToolUse)
        );
        assert_eq!(HookEventType::from_event_name("Unknown"), None);
        for event in HookEventType::ALL {
            assert_eq!(HookEventType::from_event_name(event.as_str()), Some(event));
        }
    }

    #[test]
    fn test_prompt_submit_is_processing() {
        assert_eq!(
            action(r#"{"hook_event_name":"UserPromptSubmit","session_id":"s1"}"#),
            HookAction::Write {
                state: AgentState::Processing,
                refresh: false
            }
        );
    }

    #[test]
    fn test_short_aliases_accepted() {
        assert_eq!(
            action(r#"{"event":"Notification","qualifier":"permission_prompt"}"#),
            HookAction::Write {
                state: AgentState::Waiting,
                refresh: false
            }
        );
    }

    #[test]
    fn test_notification_filter() {
        assert_eq!(
            action(r#"{"hook_event_name":"Notification","notification_type":"idle_prompt"}"#),
            HookAction::Ignore
        );
        assert_eq!(
            action(r#"{"hook_event_name":"Notification"}"#),
            HookAction::Ignore
        );
    }

    #[test]
    fn test_post_tool_use_refresh_only_for_editing_tools() {
        assert_eq!(
            action(r#"{"hook_event_name":"PostToolUse","tool_name":"Edit"}"#),
            HookAction::Write {
                state: AgentState::Processing,
                refresh: true
            }
        );
        assert_eq!(
            action(r#"{"hook_event_name":"PostToolUse","tool_name":"Read"}"#),
            HookAction::Write {
                state: AgentState::Processing,
                refresh: false
            }
        );
    }

    #[test]
    fn test_stop_and_session_end() {
        assert_eq!(
            action(r#"{"hook_event_name":"Stop"}"#),
            HookAction::Write {
                state: AgentState::Done,
                refresh: false
            }
        );
        assert_eq!(action(r#"{"hook_event_name":"SessionEnd"}"#), HookAction::Cleanup);
        assert_eq!(action(r#"{"hook_event_name":"SubagentStop"}"#), HookAction::Ignore);
        assert_eq!(action(r#"{"hook_event_name":"Bogus"}"#), HookAction::Ignore);
    }

    #[test]
    fn test_missing_event_name_is_parse_error() {
        assert!(HookPayload::parse(r#"{"session_id":"s1"}"#).is_err());
        assert!(HookPayload::parse("not json").is_err());
    }

    #[test]
    fn test_parse_lenient_drops_bad_input() {
        for input in ["", " \n", "not json", r#"{"session_id":"s1"}"#] {
            assert!(HookPayload::parse_lenient(input).is_none(), "{input:?}");
        }
        let payload = HookPayload::parse_lenient(r#"{"event":"Stop","cwd":"/p"}"#).unwrap();
        assert_eq!(payload.cwd.as_deref(), Some("/p"));
    }

    #[test]
    fn test_session_key_from_payload() {
        assert!(payload(r#"{"hook_event_name":"Stop"}"#).session_key().is_default());
        assert_eq!(
            payload(r#"{"hook_event_name":"Stop","session_id":"abc"}"#)
                .session_key()
                .as_str(),
            "abc"
        );
    }
}
