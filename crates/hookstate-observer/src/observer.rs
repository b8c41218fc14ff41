//! Wiring of a directory subscription to a registry.

use std::sync::Arc;

use hookstate_core::{Config, SessionKey, StateStore, WatchStrategy};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::alert::AlertSink;
use crate::error::WatchResult;
use crate::registry::{spawn_registry, RegistryHandle, RegistryOptions};
use crate::watcher::{subscribe, SubscribeOptions};

/// A running observer: watcher, registry and the task forwarding between
/// them.
pub struct Observer {
    handle: RegistryHandle,
    strategy: WatchStrategy,
    forward: JoinHandle<()>,
}

impl Observer {
    /// Starts watching `store` and spawns the registry.
    ///
    /// The subscription is set up before the cold-start read so nothing
    /// written in between is missed.
    pub async fn start(
        store: StateStore,
        config: &Config,
        follow: Option<SessionKey>,
        alert: Option<Arc<dyn AlertSink>>,
        cancel: CancellationToken,
    ) -> WatchResult<Self> {
        let mut subscription = subscribe(store.dir(), &SubscribeOptions::from_config(config))?;
        let strategy = subscription.strategy();

        let handle =
            spawn_registry(store, RegistryOptions::from_config(config, follow), alert).await;

        let registry = handle.clone();
        let forward = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Observer forwarding cancelled");
                        break;
                    }
                    batch = subscription.recv() => match batch {
                        Some(batch) => {
                            if registry.files_changed(batch.into_paths()).await.is_err() {
                                debug!("Registry gone, observer stopping");
                                break;
                            }
                        }
                        None => {
                            warn!("Change subscription closed");
                            break;
                        }
                    },
                }
            }
        });

        Ok(Self {
            handle,
            strategy,
            forward,
        })
    }

    pub fn handle(&self) -> &RegistryHandle {
        &self.handle
    }

    pub fn strategy(&self) -> WatchStrategy {
        self.strategy
    }

    /// Stops forwarding, withdraws the alert and stops the registry.
    pub async fn shutdown(self) {
        self.forward.abort();
        if self.handle.shutdown().await.is_err() {
            debug!("Registry already stopped");
        }
    }
}
