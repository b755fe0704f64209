use crate::codec::format_timestamp;
use crate::store::CheckpointStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Read-only summary of a store's configuration and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub enabled: bool,
    pub total: usize,
    /// Enforced bound; `None` when eviction is off.
    pub capacity: Option<usize>,
    pub rollback_count: u64,
    pub checkpoint_count: u64,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub newest_created_at: Option<DateTime<Utc>>,
}

impl CheckpointStore {
    pub fn stats(&self) -> Statistics {
        let state = self.read();
        let times = state.history.iter().map(|s| s.created_at());
        Statistics {
            enabled: self.config().enabled,
            total: state.history.len(),
            capacity: self.config().capacity(),
            rollback_count: state.rollback_count,
            checkpoint_count: state.checkpoint_count,
            oldest_created_at: times.clone().min(),
            newest_created_at: times.max(),
        }
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let capacity = self
            .capacity
            .map_or_else(|| "unbounded".to_owned(), |c| c.to_string());
        write!(
            f,
            "Store: enabled={} checkpoints={}/{} created={} rollbacks={}",
            self.enabled, self.total, capacity, self.checkpoint_count, self.rollback_count
        )?;
        if let (Some(oldest), Some(newest)) = (self.oldest_created_at, self.newest_created_at) {
            write!(
                f,
                " span={}..{}",
                format_timestamp(oldest),
                format_timestamp(newest)
            )?;
        }
        Ok(())
    }
}
