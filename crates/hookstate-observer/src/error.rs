//! Errors raised while setting up a directory subscription.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// The OS watcher could not be created.
    #[error("failed to initialize file watcher: {0}")]
    NotifyInit(#[source] notify::Error),

    /// The OS watcher refused the directory.
    #[error("failed to watch directory {path}: {source}")]
    WatchDir {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The state directory does not exist and could not be created.
    #[error("state directory {path} is unavailable: {source}")]
    MissingDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type WatchResult<T> = Result<T, WatchError>;
