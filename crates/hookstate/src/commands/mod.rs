//! Subcommand implementations.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hookstate_core::config::ENV_SESSION;
use hookstate_core::{Config, SessionKey, StateStore};

pub mod alert;
pub mod hook;
pub mod status;
pub mod watch;

/// Resolves the state directory for a project.
///
/// An explicit `--dir` wins; relative paths are taken from `project`.
pub fn state_dir(config: &Config, dir: Option<&Path>, project: &Path) -> PathBuf {
    match dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => project.join(dir),
        None => config.state_dir_for(project),
    }
}

/// State store for the current working directory.
pub fn store_here(config: &Config, dir: Option<&Path>) -> Result<StateStore> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    Ok(StateStore::new(state_dir(config, dir, &cwd)))
}

/// Path of the running binary, for commands other programs run later.
///
/// Falls back to the bare name when running under another binary (tests).
pub fn executable() -> String {
    env::current_exe()
        .ok()
        .filter(|path| path.file_stem().is_some_and(|stem| stem == "hookstate"))
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hookstate".to_string())
}

/// Session the consumer follows: the flag, then `HOOKSTATE_SESSION`.
pub fn follow_key(session: Option<String>) -> Option<SessionKey> {
    session
        .or_else(|| env::var(ENV_SESSION).ok())
        .filter(|s| !s.trim().is_empty())
        .map(|s| SessionKey::derive(Some(&s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let config = Config::default();
        assert_eq!(
            state_dir(&config, Some(Path::new("/abs/state")), Path::new("/proj")),
            PathBuf::from("/abs/state")
        );
        assert_eq!(
            state_dir(&config, Some(Path::new("rel")), Path::new("/proj")),
            PathBuf::from("/proj/rel")
        );
    }

    #[test]
    fn test_follow_key_is_sanitised() {
        assert_eq!(
            follow_key(Some("a/b".to_string())),
            Some(SessionKey::from("a_b"))
        );
    }
}
