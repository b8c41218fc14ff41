//! Terminal rendering of status snapshots.

use std::io::{self, IsTerminal, Write};

use chrono::Local;
use crossterm::style::{Color, Stylize};
use hookstate_core::{SessionKey, StatusSnapshot};
use hookstate_observer::SessionSummary;
use serde::Serialize;

/// Parses `#rrggbb` into a terminal color.
pub fn hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
    };
    Some(Color::Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

/// Writes status lines, colored when the output is a terminal.
pub struct StatusPrinter<W> {
    out: W,
    color: bool,
}

impl StatusPrinter<io::Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let color = out.is_terminal();
        Self { out, color }
    }
}

impl<W: Write> StatusPrinter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// `icon status-line`, one per call.
    pub fn print(&mut self, snapshot: &StatusSnapshot) -> io::Result<()> {
        let line = format!("{} {}", snapshot.icon(), snapshot.status_line());
        match hex_color(snapshot.color()).filter(|_| self.color) {
            Some(color) => writeln!(self.out, "{}", line.with(color)),
            None => writeln!(self.out, "{line}"),
        }?;
        self.out.flush()
    }

    /// Tells the UI layer to re-read files for `key`.
    pub fn print_reload(&mut self, key: &SessionKey) -> io::Result<()> {
        let line = format!("↻ reload [{}]", key.short());
        if self.color {
            writeln!(self.out, "{}", line.dim())?;
        } else {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }

    /// One line of JSON.
    pub fn print_json<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn print_sessions(&mut self, sessions: &[SessionSummary]) -> io::Result<()> {
        if sessions.is_empty() {
            writeln!(self.out, "No sessions")?;
            return self.out.flush();
        }
        for session in sessions {
            let snapshot =
                StatusSnapshot::new(session.key.clone(), session.state, session.last_transition);
            let since = session
                .last_transition
                .with_timezone(&Local)
                .format("%H:%M:%S");
            writeln!(
                self.out,
                "{} {:<10} {:<14} since {}",
                snapshot.icon(),
                session.key.short(),
                session.state.as_str(),
                since
            )?;
        }
        self.out.flush()
    }
}
