use crate::store::{CheckpointStore, StoreError, StoreState};
use rewind_common::Value;
use tracing::{info, warn};

/// Resolves restore requests against a store and commits the result.
///
/// Every restore copies the target payload into the store's current state
/// and returns a second, independent copy. History is never modified.
pub struct RollbackEngine<'a> {
    store: &'a CheckpointStore,
}

impl CheckpointStore {
    /// Borrow a rollback engine for this store.
    pub fn rollback(&self) -> RollbackEngine<'_> {
        RollbackEngine { store: self }
    }
}

impl RollbackEngine<'_> {
    /// Restore the checkpoint with the given id.
    pub fn restore_by_id(&self, id: &str) -> Result<Value, StoreError> {
        self.ensure_enabled()?;
        let mut state = self.store.write();
        let Some(payload) = state.find(id).map(|s| s.payload().clone()) else {
            warn!(id, "checkpoint not found for rollback");
            return Err(StoreError::NotFound(id.to_owned()));
        };
        Ok(commit(&mut state, id, payload))
    }

    /// Restore the checkpoint with the newest `created_at`.
    pub fn restore_latest(&self) -> Result<Value, StoreError> {
        self.ensure_enabled()?;
        let mut state = self.store.write();
        let Some((id, payload)) = state
            .newest_first()
            .first()
            .map(|s| (s.id().to_owned(), s.payload().clone()))
        else {
            warn!("no checkpoints available for rollback");
            return Err(StoreError::Empty);
        };
        Ok(commit(&mut state, &id, payload))
    }

    /// Restore the `n`-th newest checkpoint: `1` is the newest, `len` the oldest.
    ///
    /// This is an offset into history sorted by `created_at`, recomputed on
    /// each call, not a step relative to the last restore.
    pub fn restore_n_back(&self, n: usize) -> Result<Value, StoreError> {
        self.ensure_enabled()?;
        let mut state = self.store.write();
        let available = state.history.len();
        if n == 0 || n > available {
            warn!(requested = n, available, "invalid rollback offset");
            return Err(StoreError::InvalidOffset {
                requested: n,
                available,
            });
        }
        let target = state.newest_first()[n - 1];
        let (id, payload) = (target.id().to_owned(), target.payload().clone());
        Ok(commit(&mut state, &id, payload))
    }

    fn ensure_enabled(&self) -> Result<(), StoreError> {
        if self.store.is_enabled() {
            Ok(())
        } else {
            warn!("rollback refused: store is disabled");
            Err(StoreError::Disabled)
        }
    }
}

fn commit(state: &mut StoreState, id: &str, payload: Value) -> Value {
    state.current = payload.clone();
    state.rollback_count += 1;
    info!(id, rollback_count = state.rollback_count, "rolled back to checkpoint");
    payload
}
