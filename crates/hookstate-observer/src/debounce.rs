//! Debouncing of raw change notifications.
//!
//! The ingestor typically produces a burst per event (temp file, rename,
//! refresh signal). Raw paths are collected until the directory has been
//! quiet for the debounce window, then emitted as a single batch. A burst
//! that never goes quiet is flushed after `MAX_DELAY_FACTOR` windows so the
//! wait stays bounded.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

const MAX_DELAY_FACTOR: u32 = 4;

/// Paths that changed during one debounce window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub paths: BTreeSet<PathBuf>,
}

impl ChangeBatch {
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
    max_delay: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            max_delay: window * MAX_DELAY_FACTOR,
        }
    }

    pub fn spawn(
        self,
        raw: mpsc::UnboundedReceiver<PathBuf>,
        out: mpsc::Sender<ChangeBatch>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(raw, out))
    }

    /// Runs until either channel closes. Pending paths are flushed when the
    /// raw side closes.
    pub async fn run(self, mut raw: mpsc::UnboundedReceiver<PathBuf>, out: mpsc::Sender<ChangeBatch>) {
        while let Some(first) = raw.recv().await {
            let mut batch = ChangeBatch::default();
            batch.paths.insert(first);

            let started = Instant::now();
            let hard_deadline = started + self.max_delay;
            let mut deadline = (started + self.window).min(hard_deadline);
            let mut raw_open = true;

            loop {
                tokio::select! {
                    biased;
                    next = raw.recv() => match next {
                        Some(path) => {
                            batch.paths.insert(path);
                            deadline = (Instant::now() + self.window).min(hard_deadline);
                        }
                        None => {
                            raw_open = false;
                            break;
                        }
                    },
                    _ = sleep_until(deadline) => break,
                }
            }

            trace!(paths = batch.len(), "Debounced change batch");
            if out.send(batch).await.is_err() || !raw_open {
                break;
            }
        }
    }
}
