//! `hookstate hook`: the Event Ingestor.
//!
//! Claude Code runs this once per lifecycle event with the JSON payload on
//! stdin. It never prints anything; the exit code is the only output.
//!
//! The state directory belongs to the project the session was started in,
//! not to wherever the session has `cd`ed since.

use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use hookstate_core::{ingest, Config, HookPayload, IngestOutcome, StateStore, StoreResult};
use tracing::{debug, error, warn};

use super::state_dir;

/// Set by Claude Code to the directory the session was launched in.
pub const ENV_PROJECT_DIR: &str = "CLAUDE_PROJECT_DIR";

/// Reads stdin and ingests it.
pub fn run(config: &Config, dir: Option<&Path>) -> ExitCode {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        warn!(error = %e, "Failed to read hook payload");
        return ExitCode::SUCCESS;
    }
    let launch_dir = env::var_os(ENV_PROJECT_DIR)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match ingest_input(&input, config, dir, launch_dir.as_deref(), &cwd) {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

/// Project root: the session's launch directory, then the payload `cwd`,
/// then our own working directory.
pub fn project_root<'a>(
    launch_dir: Option<&'a Path>,
    payload: &'a HookPayload,
    cwd: &'a Path,
) -> &'a Path {
    launch_dir
        .or_else(|| payload.cwd.as_deref().map(Path::new))
        .unwrap_or(cwd)
}

/// Ingests one payload.
///
/// A malformed payload is the caller's problem and yields `Ok(None)`. Only a
/// failed store write is an error.
pub fn ingest_input(
    input: &str,
    config: &Config,
    dir: Option<&Path>,
    launch_dir: Option<&Path>,
    cwd: &Path,
) -> StoreResult<Option<IngestOutcome>> {
    let Some(payload) = HookPayload::parse_lenient(input) else {
        return Ok(None);
    };

    let project = project_root(launch_dir, &payload, cwd);
    let store = StateStore::new(state_dir(config, dir, project));

    match ingest(&payload, &store, &config.refresh.tools) {
        Ok(outcome) => {
            debug!(dir = %store.dir().display(), ?outcome, "Hook handled");
            Ok(Some(outcome))
        }
        Err(e) => {
            error!(
                event = %payload.hook_event_name,
                dir = %store.dir().display(),
                error = %e,
                "Failed to write session state"
            );
            Err(e)
        }
    }
}
