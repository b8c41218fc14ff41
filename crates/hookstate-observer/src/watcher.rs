//! Directory change subscription.
//!
//! Two sources feed the same debouncer, so consumers cannot tell them apart:
//!
//! - **Notify**: OS change notification via `notify` (inotify, FSEvents, ...).
//!   Latency is the debounce window.
//! - **Poll**: compares modification times of the store files every poll
//!   interval. Latency is bounded by the interval.
//!
//! Only store artifacts (`state*.json`, `refresh*`) are forwarded; temp
//! files from atomic writes are filtered out.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use hookstate_core::{Config, StoreFile, WatchStrategy};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::debounce::{ChangeBatch, Debouncer};
use crate::error::{WatchError, WatchResult};

/// Buffered batches before the debouncer waits on the consumer.
const BATCH_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub strategy: WatchStrategy,
    pub debounce: Duration,
    pub poll_interval: Duration,
}

impl SubscribeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            strategy: config.watch.strategy,
            debounce: config.timing.debounce(),
            poll_interval: config.timing.poll_interval(),
        }
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

enum Source {
    Notify(RecommendedWatcher),
    Poll(JoinHandle<()>),
}

/// A live, debounced subscription to one state directory.
///
/// Dropping it stops the watcher or poller.
pub struct Subscription {
    batches: mpsc::Receiver<ChangeBatch>,
    strategy: WatchStrategy,
    source: Source,
    debouncer: JoinHandle<()>,
}

impl Subscription {
    /// Next batch of changed store files, `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<ChangeBatch> {
        self.batches.recv().await
    }

    /// The strategy actually in use (notify may have fallen back to poll).
    pub fn strategy(&self) -> WatchStrategy {
        self.strategy
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Source::Poll(task) = &self.source {
            task.abort();
        }
        self.debouncer.abort();
    }
}

/// Subscribes to changes of the store files in `dir`.
///
/// The directory is created if missing. If the OS watcher cannot be set up
/// the subscription falls back to polling.
pub fn subscribe(dir: &Path, options: &SubscribeOptions) -> WatchResult<Subscription> {
    fs::create_dir_all(dir).map_err(|source| WatchError::MissingDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (batch_tx, batch_rx) = mpsc::channel(BATCH_BUFFER);
    let debouncer = Debouncer::new(options.debounce).spawn(raw_rx, batch_tx);

    let (source, strategy) = match options.strategy {
        WatchStrategy::Notify => match notify_source(dir, raw_tx.clone()) {
            Ok(watcher) => (Source::Notify(watcher), WatchStrategy::Notify),
            Err(e) => {
                warn!(error = %e, "OS file watcher unavailable, falling back to polling");
                let poller = spawn_poller(dir, options.poll_interval, raw_tx);
                (Source::Poll(poller), WatchStrategy::Poll)
            }
        },
        WatchStrategy::Poll => {
            let poller = spawn_poller(dir, options.poll_interval, raw_tx);
            (Source::Poll(poller), WatchStrategy::Poll)
        }
    };

    info!(dir = %dir.display(), ?strategy, "Watching state directory");
    Ok(Subscription {
        batches: batch_rx,
        strategy,
        source,
        debouncer,
    })
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn notify_source(dir: &Path, raw_tx: mpsc::UnboundedSender<PathBuf>) -> WatchResult<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if !is_content_change(&event.kind) {
                return;
            }
            for path in event.paths {
                if StoreFile::classify(&path).is_some() {
                    trace!(path = %path.display(), kind = ?event.kind, "Store file event");
                    let _ = raw_tx.send(path);
                }
            }
        }
        Err(e) => warn!(error = %e, "File watcher error"),
    })
    .map_err(WatchError::NotifyInit)?;

    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::WatchDir {
            path: dir.to_path_buf(),
            source,
        })?;
    Ok(watcher)
}

fn spawn_poller(
    dir: &Path,
    every: Duration,
    raw_tx: mpsc::UnboundedSender<PathBuf>,
) -> JoinHandle<()> {
    let mut poller = MtimePoller::new(dir);
    poller.prime();

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            for path in poller.poll() {
                if raw_tx.send(path).is_err() {
                    debug!("Poller stopping: debouncer gone");
                    return;
                }
            }
        }
    })
}

/// Modification-time snapshot of the store files in one directory.
#[derive(Debug)]
pub struct MtimePoller {
    dir: PathBuf,
    seen: HashMap<PathBuf, SystemTime>,
}

impl MtimePoller {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            seen: HashMap::new(),
        }
    }

    /// Takes the current snapshot without reporting anything.
    pub fn prime(&mut self) {
        self.seen = self.snapshot();
    }

    /// Paths created, modified or removed since the previous call.
    pub fn poll(&mut self) -> Vec<PathBuf> {
        let current = self.snapshot();

        let mut changed: Vec<PathBuf> = current
            .iter()
            .filter(|(path, mtime)| self.seen.get(*path) != Some(*mtime))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            self.seen
                .keys()
                .filter(|path| !current.contains_key(*path))
                .cloned(),
        );
        changed.sort();

        self.seen = current;
        changed
    }

    fn snapshot(&self) -> HashMap<PathBuf, SystemTime> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return HashMap::new();
        };
        entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                StoreFile::classify(&path)?;
                let mtime = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((path, mtime))
            })
            .collect()
    }
}
