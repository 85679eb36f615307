use thiserror::Error;

use crate::vision::VisionError;

/// Errors raised by the history engine.
///
/// `InvariantViolation` is a broken caller contract and aborts the operation.
/// `MissingCreature` and `MissingModel` are recoverable lookups that failed.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("no creature with id {0}")]
    MissingCreature(i32),
    #[error("unknown creature model {0:?}")]
    MissingModel(String),
    #[error("no creature is selected")]
    NoSelection,
    #[error("sensor computation failed for creature {creature_id}: {source}")]
    Sensor {
        creature_id: i32,
        #[source]
        source: VisionError,
    },
    #[error("history recording is disabled")]
    RecordingDisabled,
    #[error("incompatible history: {0}")]
    IncompatibleHistory(String),
    #[error("history i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed history data: {0}")]
    Json(#[from] serde_json::Error),
}
