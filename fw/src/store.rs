//! Shared state store
//!
//! Holds the latest decoded [`Record`] and, optionally, the full arrival
//! history. A single `RwLock` guards both so that `latest` and `history`
//! always change together; no lock is held across an await point.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::domain::Record;

/// Options controlling what the store retains
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Keep every record in arrival order, not just the latest
    pub keep_history: bool,
    /// Evict the oldest history entries beyond this many (None = unbounded)
    pub history_limit: Option<usize>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            keep_history: true,
            history_limit: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    latest: Option<Arc<Record>>,
    history: VecDeque<Arc<Record>>,
    writes: u64,
}

/// The process-wide holder of observed records
///
/// Shared between the ingestion task and the command loop via `Arc<Store>`.
#[derive(Debug, Default)]
pub struct Store {
    state: RwLock<State>,
    options: StoreOptions,
}

impl Store {
    /// Create an empty store
    ///
    /// A history limit of zero could never hold `latest`, so it disables
    /// history instead.
    pub fn new(mut options: StoreOptions) -> Self {
        debug!(?options, "Store::new: called");
        if options.history_limit == Some(0) {
            options.keep_history = false;
            options.history_limit = None;
        }
        Self {
            state: RwLock::new(State::default()),
            options,
        }
    }

    // Every write is a single assignment plus push, so a poisoned lock still
    // guards consistent data.
    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a newly decoded item
    ///
    /// Replaces `latest` and appends to history (if kept) under one exclusive
    /// lock. Returns the shared handle now stored as latest.
    pub fn write(&self, record: Record) -> Arc<Record> {
        let record = Arc::new(record);
        let mut state = self.write_state();

        state.latest = Some(Arc::clone(&record));
        state.writes += 1;

        if self.options.keep_history {
            state.history.push_back(Arc::clone(&record));
            if let Some(limit) = self.options.history_limit {
                while state.history.len() > limit {
                    state.history.pop_front();
                }
            }
        }

        debug!(writes = state.writes, history_len = state.history.len(), "Store::write: stored record");
        record
    }

    /// Snapshot of the most recent record, or None before the first write
    pub fn read_latest(&self) -> Option<Arc<Record>> {
        self.read_state().latest.clone()
    }

    /// Snapshot of retained records in arrival order
    ///
    /// Empty when history keeping is disabled.
    pub fn read_history(&self) -> Vec<Arc<Record>> {
        self.read_state().history.iter().cloned().collect()
    }

    /// Number of successful writes since creation
    ///
    /// Counts every write, including records since evicted from (or never
    /// kept in) history.
    pub fn writes(&self) -> u64 {
        self.read_state().writes
    }

    /// True until the first write
    pub fn is_empty(&self) -> bool {
        self.writes() == 0
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}
