//! On-disk state store.
//!
//! One directory holds every session's artifacts:
//!
//! ```text
//! <state dir>/
//!   state.json            # record for the default key
//!   refresh               # refresh signal for the default key
//!   state-<key>.json      # record for session <key>
//!   refresh-<key>         # refresh signal for session <key>
//! ```
//!
//! The ingestor is the only writer. Records are replaced whole through a
//! temp file + rename so a reader never sees a half-written record.
//! Concurrent writers resolve as last-write-wins on modification time.
//!
//! Reads are defensive: a missing directory is an empty store, and an
//! unreadable or corrupt record reads as `None`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::{SessionKey, StateRecord, StoreError, StoreResult};

const STATE_PREFIX: &str = "state";
const STATE_EXT: &str = ".json";
const REFRESH_PREFIX: &str = "refresh";

/// Kind of store artifact a filename refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFile {
    State(SessionKey),
    Refresh(SessionKey),
}

impl StoreFile {
    /// Classifies a path by its filename. Temp files and anything else
    /// unrelated return `None`.
    pub fn classify(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;

        if let Some(rest) = name.strip_prefix(STATE_PREFIX) {
            let stem = rest.strip_suffix(STATE_EXT)?;
            return key_from_suffix(stem).map(Self::State);
        }
        if let Some(rest) = name.strip_prefix(REFRESH_PREFIX) {
            return key_from_suffix(rest).map(Self::Refresh);
        }
        None
    }
}

fn key_from_suffix(suffix: &str) -> Option<SessionKey> {
    if suffix.is_empty() {
        return Some(SessionKey::default_key());
    }
    let key = suffix.strip_prefix('-')?;
    if key.is_empty() {
        return None;
    }
    let derived = SessionKey::derive(Some(key));
    // Reject names that would not round-trip (e.g. hand-made files with dots).
    (derived.as_str() == key).then_some(derived)
}

/// A state file found while scanning the store.
#[derive(Debug, Clone)]
pub struct StoredState {
    pub key: SessionKey,
    pub path: PathBuf,
    pub modified: SystemTime,
    /// `None` when the file could not be read or parsed.
    pub record: Option<StateRecord>,
}

/// Handle on one state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_path(&self, key: &SessionKey) -> PathBuf {
        if key.is_default() {
            self.dir.join(format!("{STATE_PREFIX}{STATE_EXT}"))
        } else {
            self.dir.join(format!("{STATE_PREFIX}-{key}{STATE_EXT}"))
        }
    }

    pub fn refresh_path(&self, key: &SessionKey) -> PathBuf {
        if key.is_default() {
            self.dir.join(REFRESH_PREFIX)
        } else {
            self.dir.join(format!("{REFRESH_PREFIX}-{key}"))
        }
    }

    fn ensure_dir(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    // ========================================================================
    // Writer side (ingestor)
    // ========================================================================

    /// Replaces the session's state record.
    pub fn write_state(&self, record: &StateRecord) -> StoreResult<()> {
        self.ensure_dir()?;
        let path = self.state_path(&record.session_key);
        let content = record.to_json()?;

        let write_err = |source: io::Error| StoreError::Write {
            path: path.clone(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        temp.write_all(content.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&path).map_err(|e| write_err(e.error))?;

        trace!(path = %path.display(), state = %record.state, "State record written");
        Ok(())
    }

    /// Bumps the session's refresh signal.
    ///
    /// Only the modification time matters; the content is the current unix
    /// timestamp for humans poking at the directory.
    pub fn touch_refresh(&self, key: &SessionKey) -> StoreResult<()> {
        self.ensure_dir()?;
        let path = self.refresh_path(key);
        fs::write(&path, format!("{}\n", Utc::now().timestamp())).map_err(|source| {
            StoreError::Write {
                path: path.clone(),
                source,
            }
        })?;
        trace!(path = %path.display(), "Refresh signal written");
        Ok(())
    }

    /// Removes the session's record and refresh signal.
    ///
    /// Returns true if anything was removed. Missing files are not an error.
    pub fn delete_session(&self, key: &SessionKey) -> StoreResult<bool> {
        let mut removed = false;
        for path in [self.state_path(key), self.refresh_path(key)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Remove { path, source }),
            }
        }
        Ok(removed)
    }

    // ========================================================================
    // Reader side (observer)
    // ========================================================================

    /// Reads and parses a record file, returning `None` on any failure.
    pub fn read_record(path: &Path) -> Option<StateRecord> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "Failed to read state record");
                }
                return None;
            }
        };

        match StateRecord::parse(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring corrupt state record");
                None
            }
        }
    }

    pub fn read_state(&self, key: &SessionKey) -> Option<StateRecord> {
        Self::read_record(&self.state_path(key))
    }

    /// Modification time of the session's refresh signal, if it exists.
    pub fn refresh_mtime(&self, key: &SessionKey) -> Option<SystemTime> {
        fs::metadata(self.refresh_path(key))
            .and_then(|m| m.modified())
            .ok()
    }

    /// Lists every state file in the directory with its parsed record.
    ///
    /// A missing directory yields an empty list.
    pub fn scan(&self) -> StoreResult<Vec<StoredState>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::ReadDir {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(StoreFile::State(key)) = StoreFile::classify(&path) else {
                continue;
            };
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            let record = Self::read_record(&path);
            found.push(StoredState {
                key,
                path,
                modified,
                record,
            });
        }
        Ok(found)
    }

    /// Picks the most recently modified state file. Ties go to the larger
    /// key so the choice is stable.
    pub fn most_recent(states: &[StoredState]) -> Option<&StoredState> {
        states
            .iter()
            .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.key.cmp(&b.key)))
    }
}
