//! Export/import of single checkpoints.
//!
//! The external record carries exactly these keys:
//! ```text
//! id              - checkpoint id, kept verbatim on import
//! timestamp       - RFC 3339 text in UTC, sub-second digits as needed
//! description     - free text
//! state_snapshot  - the captured payload
//! metadata        - mapping, optional (defaults to empty)
//! ```
//! Two encodings share that record: pretty JSON (the interchange format) and
//! CBOR compressed with zstd for compact archives.

use crate::snapshot::Snapshot;
use crate::store::CheckpointStore;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rewind_common::{Map, Value};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

const ZSTD_LEVEL: i32 = 3;

/// Errors from exporting a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("checkpoint not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from importing a checkpoint. The store is unchanged on any error.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("malformed checkpoint record: {0}")]
    Malformed(String),
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
    #[error("checkpoint id already in use: {0}")]
    DuplicateId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte encoding used for export and import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    CborZstd,
}

impl ExportFormat {
    /// Pick a format from a file name: `.zst`/`.cbor` is CBOR+zstd, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("zst") | Some("cbor") => Self::CborZstd,
            _ => Self::Json,
        }
    }

    /// Conventional file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::CborZstd => "cbor.zst",
        }
    }
}

/// The external form of one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub id: String,
    pub timestamp: String,
    pub description: String,
    pub state_snapshot: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Map,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map, D::Error> {
    Ok(Option::<Map>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<Snapshot> for CheckpointRecord {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            id: snapshot.id().to_owned(),
            timestamp: format_timestamp(snapshot.created_at()),
            description: snapshot.description().to_owned(),
            metadata: snapshot.metadata().clone(),
            state_snapshot: snapshot.into_payload(),
        }
    }
}

impl TryFrom<CheckpointRecord> for Snapshot {
    type Error = ImportError;

    fn try_from(record: CheckpointRecord) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp(&record.timestamp)?;
        Ok(Snapshot::new(
            record.id,
            created_at,
            record.description,
            record.state_snapshot,
            record.metadata,
        ))
    }
}

/// Lossless RFC 3339 rendering in UTC.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse RFC 3339, or a naive ISO-8601 date-time taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ImportError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ImportError::InvalidTimestamp {
            value: text.to_owned(),
            reason: e.to_string(),
        })
}

impl CheckpointStore {
    /// Serialize one checkpoint. The snapshot is copied out first so the
    /// store lock is not held while encoding.
    pub fn export(&self, id: &str, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        let Some(snapshot) = self.get(id) else {
            warn!(id, "checkpoint not found for export");
            return Err(ExportError::NotFound(id.to_owned()));
        };
        encode(&CheckpointRecord::from(snapshot), format)
    }

    /// Decode a record and append it to history under its own id.
    ///
    /// Ids already issued or imported by this store are rejected. The entry
    /// joins the same retention bound as organic checkpoints, so an import
    /// older than everything retained can be evicted immediately.
    pub fn import(&self, bytes: &[u8], format: ExportFormat) -> Result<String, ImportError> {
        let record = decode(bytes, format)?;
        let snapshot = Snapshot::try_from(record)?;
        let id = snapshot.id().to_owned();

        let mut state = self.write();
        if !state.issued_ids.insert(id.clone()) {
            warn!(id = %id, "rejected import: id already in use");
            return Err(ImportError::DuplicateId(id));
        }
        state.push(snapshot);
        let evicted = state.enforce_capacity(self.config().capacity());
        if evicted.contains(&id) {
            warn!(id = %id, "imported checkpoint is older than retained history and was evicted");
        }

        info!(id = %id, "imported checkpoint");
        Ok(id)
    }

    /// Export to a file, choosing the format from the extension.
    pub fn export_to_file(&self, id: &str, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let bytes = self.export(id, ExportFormat::from_path(path))?;
        std::fs::write(path, bytes)?;
        info!(id, path = %path.display(), "exported checkpoint");
        Ok(())
    }

    /// Import from a file, choosing the format from the extension.
    pub fn import_from_file(&self, path: impl AsRef<Path>) -> Result<String, ImportError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        self.import(&bytes, ExportFormat::from_path(path))
    }
}

fn encode(record: &CheckpointRecord, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Json => serde_json::to_vec_pretty(record)
            .map_err(|e| ExportError::Serialization(e.to_string())),
        ExportFormat::CborZstd => {
            let mut cbor = Vec::new();
            ciborium::into_writer(record, &mut cbor)
                .map_err(|e| ExportError::Serialization(e.to_string()))?;
            let mut encoder = zstd::Encoder::new(Vec::new(), ZSTD_LEVEL)?;
            encoder.write_all(&cbor)?;
            Ok(encoder.finish()?)
        }
    }
}

fn decode(bytes: &[u8], format: ExportFormat) -> Result<CheckpointRecord, ImportError> {
    match format {
        ExportFormat::Json => {
            serde_json::from_slice(bytes).map_err(|e| ImportError::Malformed(e.to_string()))
        }
        ExportFormat::CborZstd => {
            let mut decoder = zstd::Decoder::new(bytes)
                .map_err(|e| ImportError::Malformed(e.to_string()))?;
            let mut cbor = Vec::new();
            decoder
                .read_to_end(&mut cbor)
                .map_err(|e| ImportError::Malformed(e.to_string()))?;
            ciborium::from_reader(cbor.as_slice())
                .map_err(|e| ImportError::Malformed(e.to_string()))
        }
    }
}
