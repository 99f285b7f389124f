#![forbid(unsafe_code)]

//! Cell persistence over a synchronous key-value store.
//!
//! # Design
//!
//! [`Cell::persist`] binds a cell to a [`StateStore`] key: on attach it
//! rehydrates the cell from the store, then registers a durable effect that
//! serializes (JSON) and writes every subsequent change. The returned
//! [`Subscription`] is the binding's lifetime.
//!
//! # Failure Modes
//!
//! - Missing key, unreadable store, or unparseable payload on rehydration:
//!   logged at `warn!` where meaningful, cell keeps its current value.
//! - Write failures: logged at `warn!` and swallowed; the cell is
//!   unaffected. Persistence is best-effort by contract.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cell::{Cell, Subscription};

// ---------------------------------------------------------------------------
// Store collaborators
// ---------------------------------------------------------------------------

/// Synchronous, local key-value store.
pub trait StateStore {
    /// Read the raw value at `key`, if present.
    fn read(&self, key: &str) -> Option<String>;

    /// Write the raw value at `key`. Failures must be absorbed.
    fn write(&self, key: &str, value: &str);
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
    }
}

/// File-backed store: one JSON object per file, keys to raw strings.
///
/// Reads re-parse the file each time; writes rewrite it whole. Adequate for
/// settings-sized state, not for bulk data.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> serde_json::Map<String, serde_json::Value> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return serde_json::Map::new();
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "store file is not a JSON object; starting fresh");
                serde_json::Map::new()
            }
        }
    }
}

impl StateStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        self.load().get(key)?.as_str().map(str::to_owned)
    }

    fn write(&self, key: &str, value: &str) {
        let mut map = self.load();
        map.insert(key.to_owned(), serde_json::Value::String(value.to_owned()));
        let doc = serde_json::Value::Object(map);
        let serialized = doc.to_string();
        if let Err(error) = std::fs::write(&self.path, serialized) {
            tracing::warn!(path = %self.path.display(), %error, "store write failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

impl<T: Clone + Serialize + DeserializeOwned + 'static> Cell<T> {
    /// Bind this cell to `key` in `store`: rehydrate now, write on every
    /// change. Dropping the returned subscription ends the binding.
    #[must_use]
    pub fn persist(&self, store: &Rc<dyn StateStore>, key: impl Into<String>) -> Subscription {
        self.persist_with(store, key, |value| value)
    }

    /// Like [`persist`](Cell::persist), mapping the parsed value through
    /// `rehydrate` before it is written into the cell (schema migration,
    /// clamping, and the like).
    #[must_use]
    pub fn persist_with(
        &self,
        store: &Rc<dyn StateStore>,
        key: impl Into<String>,
        rehydrate: impl Fn(T) -> T + 'static,
    ) -> Subscription {
        let store = Rc::clone(store);
        let key = key.into();

        if let Some(raw) = store.read(&key) {
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => self.set(rehydrate(value)),
                Err(error) => {
                    tracing::warn!(key = %key, %error, "ignoring unparseable persisted value");
                }
            }
        }

        self.effect(
            move |new, _| match serde_json::to_string(new) {
                Ok(serialized) => store.write(&key, &serialized),
                Err(error) => {
                    tracing::warn!(key = %key, %error, "value not serializable; skipping write");
                }
            },
            false,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
