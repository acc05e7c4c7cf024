use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the sampling engine while a video phase is running
#[derive(Debug, Error)]
pub enum SessionError {
    /// Checkpoint form submitted without a scale value; the participant must
    /// complete the form or explicitly confirm the incomplete submission
    #[error("checkpoint submission is incomplete (note provided: {has_note})")]
    MalformedCheckpointSubmission { has_note: bool },

    #[error("rating {0} is outside the 1-9 scale")]
    RatingOutOfRange(u8),

    #[error("no checkpoint is active")]
    NotInCheckpoint,
}

/// Errors raised by a row sink
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to append {rows} rows to {path}: {source}")]
    PersistenceWriteFailed {
        path: PathBuf,
        rows: usize,
        #[source]
        source: std::io::Error,
    },

    /// The sink did not answer within the write timeout
    #[error("append of {rows} rows to {path} timed out after {after:?}")]
    TimedOut {
        path: PathBuf,
        rows: usize,
        after: Duration,
    },
}
