//! In-memory `Multiplexer` for tests.
//!
//! Clones share state, so a test can hand one clone to an `AlertPropagator`
//! and inspect the window options through another. Hooks are kept in a
//! session table and a window table, and a lookup only sees the table the
//! hook belongs to, like `show-hooks -g` and `show-hooks -gw` in tmux.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{TmuxError, TmuxResult};
use crate::multiplexer::{hook_entries, HookScope, Multiplexer};

#[derive(Debug, Default)]
struct MockState {
    own_window: Option<String>,
    window_options: HashMap<(String, String), String>,
    global_options: HashMap<String, String>,
    session_hooks: Vec<String>,
    window_hooks: Vec<String>,
    calls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MockMultiplexer {
    state: Arc<Mutex<MockState>>,
}

impl MockMultiplexer {
    /// A mock whose own pane lives in `window`.
    pub fn in_window(window: &str) -> Self {
        let mock = Self::default();
        mock.lock().own_window = Some(window.to_string());
        mock
    }

    /// A mock that behaves like running outside tmux.
    pub fn outside_tmux() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    pub fn set_global(&self, name: &str, value: &str) {
        self.lock()
            .global_options
            .insert(name.to_string(), value.to_string());
    }

    /// Sets a window option directly, bypassing the call log.
    pub fn preset_window_option(&self, window: &str, name: &str, value: &str) {
        self.lock()
            .window_options
            .insert((window.to_string(), name.to_string()), value.to_string());
    }

    pub fn get(&self, window: &str, name: &str) -> Option<String> {
        self.lock()
            .window_options
            .get(&(window.to_string(), name.to_string()))
            .cloned()
    }

    /// Every registered hook entry, session table first.
    pub fn hooks(&self) -> Vec<String> {
        let state = self.lock();
        state
            .session_hooks
            .iter()
            .chain(&state.window_hooks)
            .cloned()
            .collect()
    }

    /// Every mutating call made so far, e.g. `set @1 window-status-format ...`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl Multiplexer for MockMultiplexer {
    async fn own_window(&self) -> TmuxResult<String> {
        self.lock().own_window.clone().ok_or(TmuxError::NotInTmux)
    }

    async fn window_option(&self, window: &str, name: &str) -> TmuxResult<Option<String>> {
        Ok(self.get(window, name))
    }

    async fn set_window_option(&self, window: &str, name: &str, value: &str) -> TmuxResult<()> {
        self.record(format!("set {window} {name} {value}"));
        self.preset_window_option(window, name, value);
        Ok(())
    }

    async fn unset_window_option(&self, window: &str, name: &str) -> TmuxResult<()> {
        self.record(format!("unset {window} {name}"));
        self.lock()
            .window_options
            .remove(&(window.to_string(), name.to_string()));
        Ok(())
    }

    async fn global_window_option(&self, name: &str) -> TmuxResult<Option<String>> {
        Ok(self.lock().global_options.get(name).cloned())
    }

    async fn global_hook(&self, hook: &str) -> TmuxResult<Vec<String>> {
        let state = self.lock();
        let table = match HookScope::of(hook) {
            HookScope::Session => &state.session_hooks,
            HookScope::Window => &state.window_hooks,
        };
        Ok(hook_entries(&table.join("\n"), hook))
    }

    async fn append_global_hook(&self, hook: &str, command: &str) -> TmuxResult<()> {
        self.record(format!("hook {hook} {command}"));
        let mut state = self.lock();
        let table = match HookScope::of(hook) {
            HookScope::Session => &mut state.session_hooks,
            HookScope::Window => &mut state.window_hooks,
        };
        let index = hook_entries(&table.join("\n"), hook).len();
        table.push(format!("{hook}[{index}] {command}"));
        Ok(())
    }
}
