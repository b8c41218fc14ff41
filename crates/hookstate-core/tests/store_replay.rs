//! Sequences of hook invocations against one state directory.

use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use hookstate_core::{
    ingest_raw, AgentState, IngestOutcome, SessionKey, StateStore, StoreFile,
    DEFAULT_REFRESH_TOOLS,
};

fn hook(store: &StateStore, payload: &str) -> Option<IngestOutcome> {
    ingest_raw(payload, store, DEFAULT_REFRESH_TOOLS).unwrap()
}

#[test]
fn test_last_write_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());

    for payload in [
        r#"{"hook_event_name":"SessionStart","session_id":"a"}"#,
        r#"{"hook_event_name":"UserPromptSubmit","session_id":"a"}"#,
        r#"{"hook_event_name":"PreToolUse","session_id":"a","tool_name":"Bash"}"#,
        r#"{"hook_event_name":"PermissionRequest","session_id":"a","tool_name":"Bash"}"#,
        r#"{"hook_event_name":"PostToolUse","session_id":"a","tool_name":"Bash"}"#,
        r#"{"hook_event_name":"Stop","session_id":"a"}"#,
    ] {
        hook(&store, payload);
    }

    let key = SessionKey::from("a");
    assert_eq!(store.read_state(&key).unwrap().state, AgentState::Done);
    assert_eq!(store.refresh_mtime(&key), None);
}

#[test]
fn test_sessions_do_not_interfere() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());

    hook(&store, r#"{"event":"UserPromptSubmit","session_id":"one"}"#);
    hook(&store, r#"{"event":"Notification","session_id":"two","qualifier":"permission_prompt"}"#);
    hook(&store, r#"{"event":"Stop"}"#);
    hook(&store, r#"{"event":"SessionEnd","session_id":"one"}"#);

    let mut states: Vec<(String, Option<AgentState>)> = store
        .scan()
        .unwrap()
        .into_iter()
        .map(|s| (s.key.as_str().to_string(), s.record.map(|r| r.state)))
        .collect();
    states.sort();
    assert_eq!(
        states,
        vec![
            ("default".to_string(), Some(AgentState::Done)),
            ("two".to_string(), Some(AgentState::Waiting)),
        ]
    );
}

#[test]
fn test_refresh_signal_only_for_editing_tools() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());
    let key = SessionKey::default_key();

    hook(&store, r#"{"event":"PostToolUse","tool":"Read"}"#);
    assert_eq!(store.refresh_mtime(&key), None);

    let outcome = hook(&store, r#"{"event":"PostToolUse","tool":"MultiEdit"}"#);
    assert!(matches!(
        outcome,
        Some(IngestOutcome::Written { refreshed: true, .. })
    ));
    assert!(store.refresh_mtime(&key).is_some());
}

#[test]
fn test_no_temp_files_left_behind() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());
    for _ in 0..20 {
        hook(&store, r#"{"event":"PreToolUse","session_id":"busy"}"#);
    }

    for entry in std::fs::read_dir(tmp.path()).unwrap() {
        let path = entry.unwrap().path();
        assert!(
            StoreFile::classify(&path).is_some(),
            "unexpected file {}",
            path.display()
        );
    }
}

#[test]
fn test_most_recent_follows_mtime() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::new(tmp.path());
    hook(&store, r#"{"event":"Stop","session_id":"old"}"#);
    hook(&store, r#"{"event":"Stop","session_id":"new"}"#);

    let now = SystemTime::now();
    set_file_mtime(
        store.state_path(&SessionKey::from("old")),
        FileTime::from_system_time(now - Duration::from_secs(60)),
    )
    .unwrap();
    set_file_mtime(
        store.state_path(&SessionKey::from("new")),
        FileTime::from_system_time(now),
    )
    .unwrap();

    let scanned = store.scan().unwrap();
    let newest = StateStore::most_recent(&scanned).unwrap();
    assert_eq!(newest.key, SessionKey::from("new"));
}
