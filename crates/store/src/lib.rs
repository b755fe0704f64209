//! Versioned state checkpoints: capture, bounded history, rollback, export.
//!
//! # Invariants
//! - Checkpoint ids are unique for the lifetime of a store, even after eviction.
//! - With the bound enforced, history never exceeds capacity; eviction is FIFO
//!   by creation time.
//! - Snapshots never change after creation; every read hands out a copy.
//! - "Latest" and "N back" order by creation time, never by list position.

pub mod codec;
pub mod config;
pub mod integrity;
pub mod rollback;
pub mod snapshot;
pub mod stats;
pub mod store;

pub use codec::{CheckpointRecord, ExportError, ExportFormat, ImportError};
pub use config::StoreConfig;
pub use integrity::{IntegrityIssue, IntegrityReport};
pub use rollback::RollbackEngine;
pub use snapshot::Snapshot;
pub use stats::Statistics;
pub use store::{CheckpointStore, StoreError};

pub fn crate_info() -> &'static str {
    concat!("rewind-store v", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("store"));
    }

    #[test]
    fn store_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CheckpointStore>();
    }
}
