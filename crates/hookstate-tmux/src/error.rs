//! Errors from talking to the terminal multiplexer.
//!
//! None of these are fatal to state tracking: the alert is a supplementary
//! decoration, so callers log them and move on.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmuxError {
    /// Not running inside tmux, or the pane this process owns is unknown.
    #[error("not running inside tmux")]
    NotInTmux,

    /// The tmux binary could not be started.
    #[error("failed to run tmux: {0}")]
    Spawn(#[from] io::Error),

    /// tmux ran but reported failure.
    #[error("tmux {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// tmux printed something we could not interpret.
    #[error("unexpected tmux output: {0}")]
    UnexpectedOutput(String),
}

pub type TmuxResult<T> = Result<T, TmuxError>;
