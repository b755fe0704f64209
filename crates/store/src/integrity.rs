use crate::store::CheckpointStore;
use serde::Serialize;
use tracing::debug;

/// Outcome of an integrity scan over retained checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub errors: Vec<IntegrityIssue>,
}

/// A checkpoint whose payload cannot be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    pub checkpoint_id: String,
    pub error: String,
}

impl IntegrityReport {
    /// Whether every checkpoint can be exported.
    pub fn is_clean(&self) -> bool {
        self.invalid_count == 0
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Integrity: total={} valid={} invalid={}",
            self.total, self.valid_count, self.invalid_count
        )?;
        for issue in &self.errors {
            write!(f, "\n  {}: {}", issue.checkpoint_id, issue.error)?;
        }
        Ok(())
    }
}

impl CheckpointStore {
    /// Check that every retained payload is representable in the export format.
    ///
    /// Only payloads are checked. Metadata is not, so a clean report does not
    /// guarantee that `export` succeeds when metadata holds a handle. Runs
    /// under the read lock; the store is never modified.
    pub fn validate(&self) -> IntegrityReport {
        let state = self.read();
        let mut report = IntegrityReport {
            total: state.history.len(),
            ..IntegrityReport::default()
        };
        for snapshot in &state.history {
            match snapshot.payload().check_serializable() {
                Ok(()) => report.valid_count += 1,
                Err(e) => {
                    debug!(id = snapshot.id(), error = %e, "checkpoint payload not serializable");
                    report.invalid_count += 1;
                    report.errors.push(IntegrityIssue {
                        checkpoint_id: snapshot.id().to_owned(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}
