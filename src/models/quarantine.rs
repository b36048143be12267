use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured validation error: the dot-separated field path that failed
/// and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A record that failed validation, kept verbatim for later inspection.
///
/// `ts` is the shared batch validation timestamp in ISO-8601 UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub error: Vec<FieldError>,
    pub raw: Value,
    pub ts: String,
}

/// Terminal status of one validated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Valid,
    PartialFailure,
    CriticalFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineMetadata {
    pub status: BatchStatus,
    pub failure_reason: String,
    pub processed_at: String,
}

/// Payload written to the quarantine partition path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinePayload {
    pub metadata: QuarantineMetadata,
    pub records: Vec<QuarantineRecord>,
}
