use chrono::{DateTime, Utc};
use rewind_common::{Map, Value};
use sha2::{Digest, Sha256};

/// An immutable capture of application state at one instant.
///
/// Fields are private so a snapshot cannot change after the store builds it.
/// The store hands out clones; a caller mutating its copy never reaches history.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    id: String,
    created_at: DateTime<Utc>,
    description: String,
    payload: Value,
    metadata: Map,
}

impl Snapshot {
    pub(crate) fn new(
        id: String,
        created_at: DateTime<Utc>,
        description: String,
        payload: Value,
        metadata: Map,
    ) -> Self {
        Self {
            id,
            created_at,
            description,
            payload,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The captured state.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Auxiliary tags supplied with the checkpoint (e.g. trigger reason).
    pub fn metadata(&self) -> &Map {
        &self.metadata
    }

    /// Consume the snapshot, keeping only the captured state.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// SHA-256 over the canonical JSON encoding of the payload.
    ///
    /// Map keys are ordered, so equal payloads always share a fingerprint.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(&self.payload)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
