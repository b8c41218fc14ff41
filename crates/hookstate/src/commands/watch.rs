//! `hookstate watch`: the long-lived consumer.
//!
//! Starts an [`Observer`] on the state directory, prints the followed
//! session's status on every change and keeps the tmux window alert in sync
//! until SIGINT/SIGTERM. On the way out the alert is withdrawn.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use hookstate_core::{Config, SessionKey, StateStore, WatchStrategy};
use hookstate_observer::{AlertSink, Observer, RegistryHandle, SessionEvent};
use hookstate_tmux::is_in_tmux;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::alert::propagator;
use crate::output::StatusPrinter;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub follow: Option<SessionKey>,
    pub poll: bool,
    pub alert: bool,
}

pub async fn run(store: StateStore, config: Config, options: WatchOptions) -> Result<()> {
    let mut config = config;
    if options.poll {
        config.watch.strategy = WatchStrategy::Poll;
    }

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let alert: Option<Arc<dyn AlertSink>> = if options.alert && is_in_tmux() {
        Some(Arc::new(propagator(&config)))
    } else {
        None
    };

    info!(
        dir = %store.dir().display(),
        follow = ?options.follow.as_ref().map(SessionKey::as_str),
        alert = alert.is_some(),
        "hookstate watch starting"
    );

    let observer = Observer::start(store, &config, options.follow, alert, cancel.clone())
        .await
        .context("Failed to watch the state directory")?;
    if observer.strategy() != config.watch.strategy {
        warn!(strategy = ?observer.strategy(), "Using fallback watch strategy");
    }

    let mut printer = StatusPrinter::stdout();
    let result = follow(observer.handle(), &mut printer, &cancel).await;

    observer.shutdown().await;
    info!("hookstate watch stopped");
    result
}

/// Prints the status once, then again on every relevant event.
pub async fn follow<W: Write>(
    registry: &RegistryHandle,
    printer: &mut StatusPrinter<W>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut events = registry.subscribe();
    printer.print(&registry.status(None).await?)?;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(SessionEvent::BuffersReconciled { key }) => {
                printer.print_reload(&key)?;
            }
            Ok(SessionEvent::RefreshPending { key }) => {
                debug!(session_key = %key, "Refresh pending");
            }
            Ok(SessionEvent::StateChanged { .. } | SessionEvent::CurrentChanged { .. }) => {
                printer.print(&registry.status(None).await?)?;
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Event stream lagged");
                printer.print(&registry.status(None).await?)?;
            }
            Err(RecvError::Closed) => {
                warn!("Registry stopped");
                break;
            }
        }
    }
    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
