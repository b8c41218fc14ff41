//! One-shot queries: `status` and `sessions`.
//!
//! Both run a registry through its cold start, read the answer and shut it
//! down again. No alert is attached, so a one-shot query never touches tmux.

use std::io::Write;

use anyhow::{Context, Result};
use hookstate_core::{Config, SessionKey, StateStore, StatusSnapshot};
use hookstate_observer::{spawn_registry, RegistryOptions, SessionSummary};

use crate::output::StatusPrinter;

async fn snapshot(
    store: StateStore,
    config: &Config,
    follow: Option<SessionKey>,
) -> Result<StatusSnapshot> {
    let registry = spawn_registry(store, RegistryOptions::from_config(config, follow), None).await;
    let snapshot = registry
        .status(None)
        .await
        .context("Failed to query session state")?;
    let _ = registry.shutdown().await;
    Ok(snapshot)
}

async fn summaries(store: StateStore, config: &Config) -> Vec<SessionSummary> {
    let registry = spawn_registry(store, RegistryOptions::from_config(config, None), None).await;
    let sessions = registry.sessions().await;
    let _ = registry.shutdown().await;
    sessions
}

pub async fn status<W: Write>(
    store: StateStore,
    config: &Config,
    follow: Option<SessionKey>,
    json: bool,
    printer: &mut StatusPrinter<W>,
) -> Result<()> {
    let snapshot = snapshot(store, config, follow).await?;
    if json {
        printer.print_json(&snapshot)?;
    } else {
        printer.print(&snapshot)?;
    }
    Ok(())
}

pub async fn sessions<W: Write>(
    store: StateStore,
    config: &Config,
    json: bool,
    printer: &mut StatusPrinter<W>,
) -> Result<()> {
    let sessions = summaries(store, config).await;
    if json {
        printer.print_json(&sessions)?;
    } else {
        printer.print_sessions(&sessions)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookstate_core::{ingest_raw, DEFAULT_REFRESH_TOOLS};
    use serde_json::Value;

    fn seeded_store(dir: &std::path::Path) -> StateStore {
        let store = StateStore::new(dir);
        for payload in [
            r#"{"event":"UserPromptSubmit","session_id":"first"}"#,
            r#"{"event":"PermissionRequest","session_id":"second"}"#,
        ] {
            ingest_raw(payload, &store, DEFAULT_REFRESH_TOOLS).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_status_json_for_followed_session() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let mut printer = StatusPrinter::new(Vec::new(), false);

        status(
            store,
            &Config::default(),
            Some(SessionKey::from("second")),
            true,
            &mut printer,
        )
        .await
        .unwrap();

        let out = String::from_utf8(printer.into_inner()).unwrap();
        let value: Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["session_key"], "second");
        assert_eq!(value["state"], "waiting");
    }

    #[tokio::test]
    async fn test_status_of_empty_dir_is_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let mut printer = StatusPrinter::new(Vec::new(), false);

        status(
            StateStore::new(tmp.path().join("missing")),
            &Config::default(),
            None,
            false,
            &mut printer,
        )
        .await
        .unwrap();

        let out = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(out, "○ Claude: Idle\n");
    }

    #[tokio::test]
    async fn test_sessions_lists_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let store = seeded_store(tmp.path());
        let mut printer = StatusPrinter::new(Vec::new(), false);

        sessions(store, &Config::default(), true, &mut printer)
            .await
            .unwrap();

        let out = String::from_utf8(printer.into_inner()).unwrap();
        let value: Value = serde_json::from_str(out.trim()).unwrap();
        let mut keys: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["key"].as_str().unwrap())
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, ["first", "second"]);
    }
}
