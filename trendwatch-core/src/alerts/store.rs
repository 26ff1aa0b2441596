//! Alert state persistence: JSON save/load across restarts.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use super::gate::AlertState;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode alert state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable home of the last alerted signal.
///
/// Read once at the start of each check cycle, written only when an alert
/// changes the stored signal.
pub trait StateStore {
    fn load(&self) -> Result<AlertState, StateError>;
    fn save(&self, state: &AlertState) -> Result<(), StateError>;
}

/// `{"last_signal": "BUY"}` in a single JSON file.
///
/// A missing file is a fresh start. A corrupt file is logged and treated as a
/// fresh start as well, so one bad write never blocks alerting.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<AlertState, StateError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AlertState::default())
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "alert state file is corrupt, starting from an empty state"
                );
                Ok(AlertState::default())
            }
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    fn save(&self, state: &AlertState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let json = serde_json::to_string(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RefCell<AlertState>,
    saves: RefCell<usize>,
}

impl MemoryStateStore {
    pub fn new(state: AlertState) -> Self {
        Self {
            state: RefCell::new(state),
            saves: RefCell::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<AlertState, StateError> {
        Ok(*self.state.borrow())
    }

    fn save(&self, state: &AlertState) -> Result<(), StateError> {
        *self.state.borrow_mut() = *state;
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Signal;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path().join("nested/last_signal_state.json"));

        let state = AlertState {
            last_signal: Some(Signal::Sell),
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
        assert!(!dir.path().join("nested/last_signal_state.json.tmp").exists());
    }

    #[test]
    fn missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().unwrap(), AlertState::default());
    }

    #[test]
    fn corrupt_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(
            JsonStateStore::new(&path).load().unwrap(),
            AlertState::default()
        );
    }

    #[test]
    fn reads_file_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"last_signal": "BUY"}"#).unwrap();
        assert_eq!(
            JsonStateStore::new(&path).load().unwrap().last_signal,
            Some(Signal::Buy)
        );
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryStateStore::default();
        store
            .save(&AlertState {
                last_signal: Some(Signal::Buy),
            })
            .unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap().last_signal, Some(Signal::Buy));
    }
}
