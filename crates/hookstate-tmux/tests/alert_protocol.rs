//! Alert protocol tests against the in-memory multiplexer.

use hookstate_core::{AgentState, AlertConfig};
use hookstate_tmux::alert::{BASELINE_OPTION, STATUS_FORMAT};
use hookstate_tmux::{AlertPropagator, MockMultiplexer};

fn assert_clean_baseline(mux: &MockMultiplexer, window: &str, config: &AlertConfig) {
    let baseline = mux.get(window, BASELINE_OPTION).unwrap_or_default();
    for color in config.palette() {
        assert!(
            !baseline.contains(color),
            "baseline {baseline:?} contains alert color {color}"
        );
    }
    assert!(!baseline.contains("@hookstate_state"));
}

#[tokio::test]
async fn test_baseline_survives_repeated_alert_cycles() {
    let mux = MockMultiplexer::in_window("@4");
    mux.set_global(STATUS_FORMAT, "#[fg=white]#I:#W#F");
    let config = AlertConfig::default();
    let alert = AlertPropagator::new(mux.clone(), config.clone());

    let cycle = [
        AgentState::Processing,
        AgentState::Waiting,
        AgentState::Processing,
        AgentState::Done,
        AgentState::Idle,
    ];
    for _ in 0..5 {
        for state in cycle {
            alert.try_apply(state).await.unwrap();
            assert_clean_baseline(&mux, "@4", &config);
        }
    }

    assert_eq!(
        mux.get("@4", BASELINE_OPTION).as_deref(),
        Some("#[fg=white]#I:#W#F")
    );
}

#[tokio::test]
async fn test_baseline_captured_once() {
    let mux = MockMultiplexer::in_window("@1");
    mux.set_global(STATUS_FORMAT, "#I:#W");
    let alert = AlertPropagator::new(mux.clone(), AlertConfig::default());

    alert.try_apply(AgentState::Processing).await.unwrap();
    // The user changes their global format while the alert is up.
    mux.set_global(STATUS_FORMAT, "#W");
    alert.try_apply(AgentState::Done).await.unwrap();

    let baseline_writes = mux
        .calls()
        .iter()
        .filter(|c| c.contains(BASELINE_OPTION))
        .count();
    assert_eq!(baseline_writes, 1);
}

#[tokio::test]
async fn test_window_alert_format_while_alerting_is_never_saved() {
    // Another consumer already decorated this window with a different palette,
    // and no baseline was cached.
    let mux = MockMultiplexer::in_window("@9");
    mux.preset_window_option(
        "@9",
        STATUS_FORMAT,
        &hookstate_tmux::alert_format("#I", "colour200"),
    );
    mux.set_global(STATUS_FORMAT, "#I:#W");
    let config = AlertConfig::default();
    let alert = AlertPropagator::new(mux.clone(), config.clone());

    alert.try_apply(AgentState::Waiting).await.unwrap();

    assert_eq!(mux.get("@9", BASELINE_OPTION).as_deref(), Some("#I:#W"));
    assert_clean_baseline(&mux, "@9", &config);
}

#[tokio::test]
async fn test_clear_by_window_id_from_focus_hook() {
    let mux = MockMultiplexer::in_window("@1");
    let alert = AlertPropagator::new(mux.clone(), AlertConfig::default());

    alert.try_apply(AgentState::Done).await.unwrap();
    assert!(mux.get("@1", STATUS_FORMAT).is_some());

    alert.clear_window("@1").await.unwrap();
    assert!(mux.get("@1", STATUS_FORMAT).is_none());
}
