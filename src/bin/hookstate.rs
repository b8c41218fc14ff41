//! hookstate - session state sync for Claude Code
//!
//! # Usage
//!
//! ```text
//! hookstate hook                      # Event Ingestor (run by Claude Code hooks)
//! hookstate watch [--session KEY]     # Follow state, drive the tmux alert
//! hookstate status [--json]           # Print the current status once
//! hookstate sessions                  # List sessions in the state directory
//! hookstate alert install-focus-hook  # Clear the alert on tmux window focus
//! hookstate setup                     # Configure Claude Code hooks
//! hookstate uninstall                 # Remove hooks
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use hookstate_cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    hookstate_cli::run(Args::parse()).await
}
