use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::TerminationReason;

/// Outcome of all row-sink submissions during a phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Non-empty batches handed to the sink
    pub batches: usize,

    pub rows_written: usize,

    /// Batches the sink rejected
    pub failures: usize,

    /// Rows in rejected batches; these are not re-queued
    pub rows_lost: usize,
}

/// Summary of a finished video rating phase
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When the runner started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Continuous and checkpoint records created
    pub records_emitted: u64,

    pub checkpoints_completed: u32,

    pub flush: FlushReport,

    pub termination: TerminationReason,
}
