//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hookstate_core::AgentState;

/// hookstate - share Claude Code session state through the filesystem
#[derive(Parser, Debug)]
#[command(name = "hookstate")]
#[command(about = "Sync Claude Code session state to status lines and tmux")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// State directory (overrides config and HOOKSTATE_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest one hook event from stdin (invoked by Claude Code)
    Hook,

    /// Follow session state, print it on every change and keep the tmux alert in sync
    Watch {
        /// Session to follow (default: HOOKSTATE_SESSION, else the most recent one)
        #[arg(long, short = 's')]
        session: Option<String>,

        /// Poll modification times instead of using OS change notification
        #[arg(long)]
        poll: bool,

        /// Do not touch the tmux window status
        #[arg(long)]
        no_alert: bool,
    },

    /// Print the current status once
    Status {
        /// Session to report (default: HOOKSTATE_SESSION, else the most recent one)
        #[arg(long, short = 's')]
        session: Option<String>,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every session in the state directory, newest first
    Sessions {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the tmux window alert
    Alert {
        #[command(subcommand)]
        action: AlertCommand,
    },

    /// Configure Claude Code hooks for hookstate
    Setup,

    /// Remove hookstate hooks from Claude Code
    Uninstall,
}

#[derive(Subcommand, Debug)]
pub enum AlertCommand {
    /// Remove the alert (used by the window-switch hook)
    Clear {
        /// Window id, e.g. @3 (default: the window of this pane)
        #[arg(long)]
        window: Option<String>,
    },

    /// Show the alert for a state on this pane's window
    Set {
        /// idle, processing, waiting or done
        #[arg(value_parser = parse_state)]
        state: AgentState,
    },

    /// Register the tmux hook that clears the alert on focus
    InstallFocusHook,
}

fn parse_state(s: &str) -> Result<AgentState, String> {
    s.parse::<AgentState>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_watch_flags() {
        let args = Args::try_parse_from(["hookstate", "watch", "-s", "abc", "--poll"]).unwrap();
        match args.command {
            Command::Watch {
                session,
                poll,
                no_alert,
            } => {
                assert_eq!(session.as_deref(), Some("abc"));
                assert!(poll);
                assert!(!no_alert);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_dir_after_subcommand() {
        let args = Args::try_parse_from(["hookstate", "status", "--dir", "/tmp/s", "--json"]).unwrap();
        assert_eq!(args.dir, Some(PathBuf::from("/tmp/s")));
        assert!(matches!(args.command, Command::Status { json: true, .. }));
    }

    #[test]
    fn test_alert_set_parses_state() {
        let args = Args::try_parse_from(["hookstate", "alert", "set", "waiting"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Alert {
                action: AlertCommand::Set {
                    state: AgentState::Waiting
                }
            }
        ));
        assert!(Args::try_parse_from(["hookstate", "alert", "set", "busy"]).is_err());
    }

    #[test]
    fn test_alert_clear_window() {
        let args =
            Args::try_parse_from(["hookstate", "alert", "clear", "--window", "@7"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Alert {
                action: AlertCommand::Clear { window: Some(ref w) }
            } if w == "@7"
        ));
    }
}
