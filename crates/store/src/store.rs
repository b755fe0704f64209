//! In-memory checkpoint history.
//!
//! History is kept in insertion order. Anything temporal ("latest", "N back",
//! newest-first listings) orders by `created_at`, with later insertion
//! breaking ties, so imported entries with old timestamps sort correctly.

use crate::config::StoreConfig;
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rewind_common::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Recoverable failures of checkpoint and restore operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("checkpoint store is disabled")]
    Disabled,
    #[error("checkpoint not found: {0}")]
    NotFound(String),
    #[error("invalid rollback offset {requested}: history holds {available} checkpoints")]
    InvalidOffset { requested: usize, available: usize },
    #[error("no checkpoints available")]
    Empty,
}

/// Mutable state guarded by the store's lock.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) history: Vec<Snapshot>,
    pub(crate) current: Value,
    /// Every id ever issued or imported; never shrinks.
    pub(crate) issued_ids: HashSet<String>,
    pub(crate) next_seq: u64,
    pub(crate) checkpoint_count: u64,
    pub(crate) rollback_count: u64,
    last_created_at: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Allocate the next id. The counter guarantees uniqueness; the
    /// timestamp suffix only keeps ids readable.
    fn next_id(&mut self, created_at: DateTime<Utc>) -> String {
        let stamp = created_at.format("%Y%m%d_%H%M%S").to_string();
        loop {
            let candidate = format!("checkpoint_{}_{stamp}", self.next_seq);
            self.next_seq += 1;
            if self.issued_ids.insert(candidate.clone()) {
                return candidate;
            }
            debug!(id = %candidate, "id taken by an imported checkpoint, advancing counter");
        }
    }

    /// Clock reading clamped so creation times never go backwards.
    fn creation_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created_at = match self.last_created_at {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_created_at = Some(created_at);
        created_at
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        debug_assert!(
            self.history.iter().all(|s| s.id() != snapshot.id()),
            "duplicate checkpoint id {}",
            snapshot.id()
        );
        self.history.push(snapshot);
    }

    /// Evict oldest entries until the bound holds. Returns evicted ids.
    pub(crate) fn enforce_capacity(&mut self, capacity: Option<usize>) -> Vec<String> {
        let Some(capacity) = capacity else {
            return Vec::new();
        };
        let mut evicted = Vec::new();
        while self.history.len() > capacity {
            // min_by_key keeps the first minimum, so insertion order breaks ties.
            let Some(oldest) = self
                .history
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.created_at())
                .map(|(idx, _)| idx)
            else {
                break;
            };
            let removed = self.history.remove(oldest);
            debug!(id = removed.id(), "evicted oldest checkpoint");
            evicted.push(removed.id().to_owned());
        }
        evicted
    }

    /// History ordered newest first by `created_at`.
    pub(crate) fn newest_first(&self) -> Vec<&Snapshot> {
        let mut ordered: Vec<(usize, &Snapshot)> = self.history.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| ib.cmp(ia))
        });
        ordered.into_iter().map(|(_, s)| s).collect()
    }

    pub(crate) fn find(&self, id: &str) -> Option<&Snapshot> {
        self.history.iter().find(|s| s.id() == id)
    }
}

/// Bounded, ordered history of state snapshots.
///
/// Writers (checkpoint, delete, clear, import, restores) are serialized by
/// an `RwLock`; readers (get, history, stats, validate) share it and always
/// observe a fully evicted list. Share across threads with `Arc`.
#[derive(Debug)]
pub struct CheckpointStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl CheckpointStore {
    pub fn new(config: StoreConfig) -> Self {
        info!(
            enabled = config.enabled,
            max_history = config.max_history,
            auto_cleanup = config.auto_cleanup,
            "initialized checkpoint store"
        );
        Self {
            config,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write()
    }

    /// Capture a deep copy of `payload` (and `metadata`) as a new checkpoint.
    ///
    /// The copy also becomes the current state. When the bound is enforced
    /// and exceeded, the oldest checkpoint is evicted.
    pub fn checkpoint(
        &self,
        description: &str,
        payload: &Value,
        metadata: Option<&Map>,
    ) -> Result<String, StoreError> {
        if !self.config.enabled {
            warn!(description, "checkpoint refused: store is disabled");
            return Err(StoreError::Disabled);
        }

        let mut state = self.write();
        let created_at = state.creation_time();
        let id = state.next_id(created_at);
        state.push(Snapshot::new(
            id.clone(),
            created_at,
            description.to_owned(),
            payload.clone(),
            metadata.cloned().unwrap_or_default(),
        ));
        state.current = payload.clone();
        state.checkpoint_count += 1;
        state.enforce_capacity(self.config.capacity());

        info!(id = %id, description, "created checkpoint");
        Ok(id)
    }

    /// Copy of the checkpoint with the given id, if retained.
    pub fn get(&self, id: &str) -> Option<Snapshot> {
        self.read().find(id).cloned()
    }

    /// Remove a checkpoint. Leaves the current state untouched.
    pub fn delete(&self, id: &str) -> bool {
        let mut state = self.write();
        let position = state.history.iter().position(|s| s.id() == id);
        match position {
            Some(idx) => {
                state.history.remove(idx);
                info!(id, "deleted checkpoint");
                true
            }
            None => {
                warn!(id, "checkpoint not found for deletion");
                false
            }
        }
    }

    /// Drop all history and reset the current state.
    ///
    /// Issued ids stay reserved, so later checkpoints never reuse them.
    pub fn clear(&self) {
        let mut state = self.write();
        let cleared = state.history.len();
        state.history.clear();
        state.current = Value::Null;
        info!(cleared, "cleared checkpoint history");
    }

    /// Copies of all retained checkpoints, newest first.
    pub fn history(&self) -> Vec<Snapshot> {
        self.read().newest_first().into_iter().cloned().collect()
    }

    /// Copy of the most recently committed state.
    pub fn current(&self) -> Value {
        self.read().current.clone()
    }

    pub fn len(&self) -> usize {
        self.read().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn state(x: i64) -> Value {
        Value::from(json!({ "x": x }))
    }

    #[test]
    fn checkpoint_ids_are_unique() {
        let store = CheckpointStore::new(StoreConfig::unbounded());
        let ids: Vec<String> = (0..50)
            .map(|i| store.checkpoint("step", &state(i), None).unwrap())
            .collect();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn id_format_has_counter_and_timestamp() {
        let store = CheckpointStore::default();
        let id = store.checkpoint("init", &state(1), None).unwrap();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "checkpoint");
        assert_eq!(parts[1], "0");
        assert_eq!(parts[2].len(), 8);
        assert_eq!(parts[3].len(), 6);
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let store = CheckpointStore::default();
        let first = store.checkpoint("a", &state(1), None).unwrap();
        store.clear();
        let second = store.checkpoint("b", &state(2), None).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn bounded_history_keeps_most_recent() {
        let store = CheckpointStore::new(StoreConfig::with_capacity(3));
        let ids: Vec<String> = (0..7)
            .map(|i| store.checkpoint("step", &state(i), None).unwrap())
            .collect();
        assert_eq!(store.len(), 3);
        let retained: Vec<String> = store
            .history()
            .iter()
            .rev()
            .map(|s| s.id().to_owned())
            .collect();
        assert_eq!(retained, ids[4..].to_vec());
    }

    #[test]
    fn unbounded_history_never_evicts() {
        let store = CheckpointStore::new(StoreConfig::unbounded());
        for i in 0..25 {
            store.checkpoint("step", &state(i), None).unwrap();
        }
        assert_eq!(store.len(), 25);
    }

    #[test]
    fn capacity_two_evicts_first_entry() {
        let store = CheckpointStore::new(StoreConfig::with_capacity(2));
        let a = store.checkpoint("init", &state(1), None).unwrap();
        let b = store.checkpoint("update", &state(2), None).unwrap();
        let c = store.checkpoint("final", &state(3), None).unwrap();

        let history = store.history();
        let ids: Vec<&str> = history.iter().map(Snapshot::id).collect();
        assert_eq!(ids, vec![c.as_str(), b.as_str()]);
        assert!(store.get(&a).is_none());
    }

    #[test]
    fn ingress_is_deep_copied() {
        let store = CheckpointStore::default();
        let mut live = Value::from(json!({"items": [1, 2], "x": 1}));
        let id = store.checkpoint("before", &live, None).unwrap();

        live.insert("x", 42);
        live.insert("items", Value::List(vec![]));

        let stored = store.get(&id).unwrap();
        assert_eq!(stored.payload(), &Value::from(json!({"items": [1, 2], "x": 1})));
        assert_eq!(store.current().get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn metadata_defaults_to_empty_and_is_copied() {
        let store = CheckpointStore::default();
        let id = store.checkpoint("plain", &state(1), None).unwrap();
        assert!(store.get(&id).unwrap().metadata().is_empty());

        let mut metadata = Map::new();
        metadata.insert("reason".into(), Value::from("manual"));
        let id = store.checkpoint("tagged", &state(2), Some(&metadata)).unwrap();
        metadata.insert("reason".into(), Value::from("changed"));
        assert_eq!(
            store.get(&id).unwrap().metadata().get("reason"),
            Some(&Value::from("manual"))
        );
    }

    #[test]
    fn disabled_store_refuses_checkpoints() {
        let store = CheckpointStore::new(StoreConfig::disabled());
        assert_eq!(
            store.checkpoint("nope", &state(1), None),
            Err(StoreError::Disabled)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn get_missing_returns_none() {
        let store = CheckpointStore::default();
        assert!(store.get("checkpoint_404").is_none());
    }

    #[test]
    fn delete_removes_entry_but_keeps_current() {
        let store = CheckpointStore::default();
        let id = store.checkpoint("only", &state(7), None).unwrap();
        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.is_empty());
        assert_eq!(store.current(), state(7));
    }

    #[test]
    fn clear_resets_history_and_current() {
        let store = CheckpointStore::default();
        store.checkpoint("a", &state(1), None).unwrap();
        store.checkpoint("b", &state(2), None).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.current().is_null());
    }

    #[test]
    fn creation_times_never_decrease() {
        let store = CheckpointStore::new(StoreConfig::unbounded());
        for i in 0..20 {
            store.checkpoint("t", &state(i), None).unwrap();
        }
        let history = store.history();
        for pair in history.windows(2) {
            assert!(pair[0].created_at() >= pair[1].created_at());
        }
    }

    #[test]
    fn concurrent_checkpoints_respect_bound_and_uniqueness() {
        let store = Arc::new(CheckpointStore::new(StoreConfig::with_capacity(8)));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| store.checkpoint("worker", &state(t * 100 + i), None).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 100);
        assert_eq!(store.len(), 8);
    }
}
