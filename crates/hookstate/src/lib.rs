//! hookstate CLI - library modules
//!
//! The `hookstate` binary is a thin wrapper over [`run`]. Subcommands:
//!
//! 1. **hook**: the Event Ingestor, run by Claude Code once per event
//! 2. **watch**: the long-lived consumer (status line and tmux alert)
//! 3. **status** / **sessions**: one-shot queries
//! 4. **alert**: manual tmux alert control and focus-hook registration
//! 5. **setup** / **uninstall**: Claude Code settings integration

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
pub mod setup;

use std::process::ExitCode;

use anyhow::Result;
use hookstate_core::Config;
use tracing::debug;

pub use cli::{AlertCommand, Args, Command};
use commands::watch::WatchOptions;
use logging::LogTarget;
use output::StatusPrinter;

/// Runs one parsed command line.
pub async fn run(args: Args) -> Result<ExitCode> {
    let target = match args.command {
        Command::Hook => LogTarget::Hook,
        Command::Watch { .. } => LogTarget::Watch,
        _ => LogTarget::Stderr,
    };
    logging::init(target);

    let config = Config::load();
    let dir = args.dir.as_deref();
    debug!(command = ?args.command, "hookstate starting");

    match args.command {
        Command::Hook => return Ok(commands::hook::run(&config, dir)),
        Command::Watch {
            session,
            poll,
            no_alert,
        } => {
            let store = commands::store_here(&config, dir)?;
            let options = WatchOptions {
                follow: commands::follow_key(session),
                poll,
                alert: !no_alert,
            };
            commands::watch::run(store, config, options).await?;
        }
        Command::Status { session, json } => {
            let store = commands::store_here(&config, dir)?;
            let follow = commands::follow_key(session);
            let mut printer = StatusPrinter::stdout();
            commands::status::status(store, &config, follow, json, &mut printer).await?;
        }
        Command::Sessions { json } => {
            let store = commands::store_here(&config, dir)?;
            let mut printer = StatusPrinter::stdout();
            commands::status::sessions(store, &config, json, &mut printer).await?;
        }
        Command::Alert { action } => {
            let alert = commands::alert::propagator(&config);
            match action {
                AlertCommand::Clear { window } => {
                    commands::alert::clear(&alert, window.as_deref()).await;
                }
                AlertCommand::Set { state } => {
                    commands::alert::set(&alert, state).await?;
                }
                AlertCommand::InstallFocusHook => {
                    let outcome = commands::alert::install_focus_hook(
                        &alert,
                        &commands::executable(),
                    )
                    .await?;
                    println!("{outcome}");
                }
            }
        }
        Command::Setup => setup::setup()?,
        Command::Uninstall => setup::uninstall()?,
    }

    Ok(ExitCode::SUCCESS)
}
