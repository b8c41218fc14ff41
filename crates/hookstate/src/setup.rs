//! Hook configuration for Claude Code integration
//!
//! Merges `hookstate hook` into `~/.claude/settings.json` for every hook
//! event the ingestor understands, and removes exactly those entries again.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use hookstate_core::HookEventType;
use serde_json::{json, Map, Value};

use crate::commands::executable;

/// Substring identifying commands owned by hookstate.
const OWNED_COMMAND: &str = "hookstate hook";

/// Returns the path to Claude Code settings.json
fn claude_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("settings.json"))
}

/// Command line Claude Code runs for every hook event.
///
/// Uses the absolute path of the running binary so hooks work without
/// `PATH` set up.
pub fn hook_command() -> String {
    format!("{} hook", executable())
}

/// Reads Claude Code settings, returns empty object if file doesn't exist
fn read_settings() -> Result<Value> {
    let path = claude_settings_path().context("Could not determine home directory")?;

    if !path.exists() {
        return Ok(json!({}));
    }

    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_settings(settings: &Value) -> Result<()> {
    let path = claude_settings_path().context("Could not determine home directory")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Creates a hook entry for the given event.
///
/// Tool events filter by tool name and get a catch-all matcher.
fn create_hook_entry(event: HookEventType, command: &str) -> Value {
    let hooks = json!([{
        "type": "command",
        "command": command
    }]);

    if event.uses_tool_matcher() {
        json!({ "matcher": "*", "hooks": hooks })
    } else {
        json!({ "hooks": hooks })
    }
}

fn is_owned_entry(entry: &Value) -> bool {
    entry
        .get("hooks")
        .and_then(|h| h.as_array())
        .is_some_and(|hooks| {
            hooks.iter().any(|hook| {
                hook.get("command")
                    .and_then(|c| c.as_str())
                    .is_some_and(|cmd| cmd.contains(OWNED_COMMAND))
            })
        })
}

/// Per-event result of an install or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChange {
    Added,
    AlreadyConfigured,
    Removed(usize),
}

/// Adds the ingestor to every event list that lacks it.
pub fn install_hooks(
    settings: &mut Value,
    command: &str,
) -> Result<Vec<(HookEventType, HookChange)>> {
    let root = settings
        .as_object_mut()
        .context("settings is not a JSON object")?;
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .context("hooks is not an object")?;

    let mut changes = Vec::new();
    for event in HookEventType::ALL {
        let entries = hooks
            .entry(event.as_str())
            .or_insert_with(|| json!([]))
            .as_array_mut()
            .with_context(|| format!("hooks.{event} is not an array"))?;

        if entries.iter().any(is_owned_entry) {
            changes.push((event, HookChange::AlreadyConfigured));
        } else {
            entries.push(create_hook_entry(event, command));
            changes.push((event, HookChange::Added));
        }
    }
    Ok(changes)
}

/// Removes hookstate entries, dropping event lists left empty.
///
/// Entries owned by other tools are left alone.
pub fn remove_hooks(settings: &mut Value) -> Vec<(String, HookChange)> {
    let mut changes = Vec::new();
    let Some(hooks) = settings.get_mut("hooks").and_then(|h| h.as_object_mut()) else {
        return changes;
    };

    let mut emptied = Vec::new();
    for (event, entries) in hooks.iter_mut() {
        let Some(entries) = entries.as_array_mut() else {
            continue;
        };
        let before = entries.len();
        entries.retain(|entry| !is_owned_entry(entry));
        let removed = before - entries.len();
        if removed > 0 {
            changes.push((event.clone(), HookChange::Removed(removed)));
            if entries.is_empty() {
                emptied.push(event.clone());
            }
        }
    }
    for event in emptied {
        hooks.remove(&event);
    }
    changes
}

/// Installs hookstate hooks into Claude Code settings
pub fn setup() -> Result<()> {
    println!("Setting up hookstate...\n");

    let command = hook_command();
    println!("Hook command: {command}\n");
    println!("Configuring Claude Code hooks...");

    let mut settings = read_settings()?;
    let changes = install_hooks(&mut settings, &command)?;

    let mut added = 0;
    for (event, change) in &changes {
        match change {
            HookChange::Added => {
                added += 1;
                println!("  {event} - added");
            }
            _ => println!("  {event} - already configured"),
        }
    }

    if added > 0 {
        write_settings(&settings)?;
        println!("\nConfiguration complete!");
    } else {
        println!("\nAll hooks already configured.");
    }

    println!("\nNext steps:");
    println!("  Run: hookstate watch");
    println!("  In tmux, optionally: hookstate alert install-focus-hook");

    Ok(())
}

/// Removes hookstate hooks from Claude Code settings
pub fn uninstall() -> Result<()> {
    println!("Uninstalling hookstate...\n");
    println!("Removing Claude Code hooks...");

    let mut settings = read_settings()?;
    let changes = remove_hooks(&mut settings);

    if changes.is_empty() {
        println!("  No hooks found");
    } else {
        for (event, _) in &changes {
            println!("  {event} - removed");
        }
        write_settings(&settings)?;
    }

    println!("\nhookstate uninstalled successfully!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMAND: &str = "/usr/local/bin/hookstate hook";

    #[test]
    fn test_install_into_empty_settings() {
        let mut settings = json!({});
        let changes = install_hooks(&mut settings, COMMAND).unwrap();

        assert_eq!(changes.len(), HookEventType::ALL.len());
        assert!(changes.iter().all(|(_, c)| *c == HookChange::Added));

        let pre = &settings["hooks"]["PreToolUse"][0];
        assert_eq!(pre["matcher"], "*");
        assert_eq!(pre["hooks"][0]["command"], COMMAND);
        assert!(settings["hooks"]["Stop"][0].get("matcher").is_none());
    }

    #[test]
    fn test_install_is_idempotent() {
        let mut settings = json!({});
        install_hooks(&mut settings, COMMAND).unwrap();
        let snapshot = settings.clone();

        let changes = install_hooks(&mut settings, "hookstate hook").unwrap();
        assert!(changes
            .iter()
            .all(|(_, c)| *c == HookChange::AlreadyConfigured));
        assert_eq!(settings, snapshot);
    }

    #[test]
    fn test_install_keeps_foreign_hooks() {
        let mut settings = json!({
            "model": "opus",
            "hooks": {
                "Stop": [{ "hooks": [{ "type": "command", "command": "notify-send done" }] }]
            }
        });
        install_hooks(&mut settings, COMMAND).unwrap();

        assert_eq!(settings["model"], "opus");
        assert_eq!(settings["hooks"]["Stop"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_only_owned_entries() {
        let mut settings = json!({
            "hooks": {
                "Stop": [{ "hooks": [{ "type": "command", "command": "notify-send done" }] }]
            }
        });
        install_hooks(&mut settings, COMMAND).unwrap();

        let changes = remove_hooks(&mut settings);
        assert_eq!(changes.len(), HookEventType::ALL.len());

        let hooks = settings["hooks"].as_object().unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(
            hooks["Stop"][0]["hooks"][0]["command"],
            "notify-send done"
        );
    }

    #[test]
    fn test_remove_without_hooks_is_noop() {
        let mut settings = json!({ "model": "opus" });
        assert!(remove_hooks(&mut settings).is_empty());
        assert_eq!(settings, json!({ "model": "opus" }));
    }

    #[test]
    fn test_rejects_non_object_hooks() {
        let mut settings = json!({ "hooks": [] });
        assert!(install_hooks(&mut settings, COMMAND).is_err());
    }

    #[test]
    fn test_hook_command_suffix() {
        assert!(hook_command().ends_with(OWNED_COMMAND));
    }
}
