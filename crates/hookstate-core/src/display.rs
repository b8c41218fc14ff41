//! Presentation of a session's state for status displays.
//!
//! These are the pure queries handed to UI front-ends: icon, color and a
//! formatted status line.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{AgentState, SessionKey};

/// Returns the icon for a state.
#[must_use]
pub fn state_icon(state: AgentState) -> &'static str {
    match state {
        AgentState::Idle => "○",
        AgentState::Processing => "◐",
        AgentState::Waiting => "⏸",
        AgentState::Done => "●",
    }
}

/// Returns the display color for a state as a `#rrggbb` string.
///
/// Color coding:
/// - Gray: Idle (nothing to look at)
/// - Blue: Processing
/// - Amber: Waiting (needs the user)
/// - Green: Done
#[must_use]
pub fn state_color(state: AgentState) -> &'static str {
    match state {
        AgentState::Idle => "#7f849c",
        AgentState::Processing => "#89b4fa",
        AgentState::Waiting => "#f9e2af",
        AgentState::Done => "#a6e3a1",
    }
}

/// Human-readable label used in the status line.
#[must_use]
pub fn state_label(state: AgentState) -> &'static str {
    match state {
        AgentState::Idle => "Idle",
        AgentState::Processing => "Working",
        AgentState::Waiting => "Needs approval",
        AgentState::Done => "Done",
    }
}

/// Formats an elapsed duration compactly: "35s", "2m", "1h".
fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h", secs / 3600)
    }
}

/// Snapshot of what a status display should show for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub session_key: SessionKey,
    pub state: AgentState,
    pub since: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(session_key: SessionKey, state: AgentState, since: DateTime<Utc>) -> Self {
        Self {
            session_key,
            state,
            since,
        }
    }

    /// Snapshot for a session nothing is known about.
    pub fn idle(session_key: SessionKey) -> Self {
        Self::new(session_key, AgentState::Idle, Utc::now())
    }

    pub fn icon(&self) -> &'static str {
        state_icon(self.state)
    }

    pub fn color(&self) -> &'static str {
        state_color(self.state)
    }

    /// Formatted status line, e.g. `Claude: Working (12s)`.
    ///
    /// Idle shows no elapsed time; a non-default session key is appended in
    /// short form so concurrent sessions can be told apart.
    pub fn status_line_at(&self, now: DateTime<Utc>) -> String {
        let mut line = format!("Claude: {}", state_label(self.state));
        if self.state != AgentState::Idle {
            let elapsed = now.signed_duration_since(self.since).num_seconds();
            line.push_str(&format!(" ({})", format_elapsed(elapsed)));
        }
        if !self.session_key.is_default() {
            line.push_str(&format!(" [{}]", self.session_key.short()));
        }
        line
    }

    pub fn status_line(&self) -> String {
        self.status_line_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_every_state_has_distinct_icon_and_color() {
        let icons: std::collections::HashSet<_> =
            AgentState::ALL.iter().map(|s| state_icon(*s)).collect();
        let colors: std::collections::HashSet<_> =
            AgentState::ALL.iter().map(|s| state_color(*s)).collect();
        assert_eq!(icons.len(), 4);
        assert_eq!(colors.len(), 4);
    }

    #[test]
    fn test_status_line_idle_default_key() {
        let snap = StatusSnapshot::idle(SessionKey::default_key());
        assert_eq!(snap.status_line(), "Claude: Idle");
    }

    #[test]
    fn test_status_line_with_elapsed_and_key() {
        let now = Utc::now();
        let snap = StatusSnapshot::new(
            SessionKey::from("8e11bfb5-7dc2"),
            AgentState::Processing,
            now - Duration::seconds(125),
        );
        assert_eq!(snap.status_line_at(now), "Claude: Working (2m) [8e11bfb5]");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(-3), "0s");
        assert_eq!(format_elapsed(59), "59s");
        assert_eq!(format_elapsed(3600), "1h");
    }
}
