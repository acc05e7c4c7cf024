use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;

use super::metadata::{RatingTarget, SessionMetadata};

/// Header line for the ratings file, in persisted column order
pub const RATINGS_HEADER: &str = "participantId,partnerId,dyadId,computerSide,subjectInitials,saveFolder,raName,sessionTime,sessionDate,wallClockISO8601,taskOrder,continuousValue,discreteRating,ratingTarget,elapsedSeconds,boundarySeconds,playbackSeconds,isCheckpoint,note,trialNumber,schemaVersion";

/// Distinguishes continuous samples from checkpoint-terminal records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Continuous,
    Checkpoint,
}

impl RecordKind {
    fn flag(self) -> &'static str {
        match self {
            RecordKind::Continuous => "0",
            RecordKind::Checkpoint => "1",
        }
    }
}

/// One observation of the continuous signal at a moment in session and playback time
#[derive(Debug, Clone)]
pub struct SampleRecord {
    /// Wall-clock time the record was created
    pub timestamp: DateTime<Utc>,

    /// Continuous value in [0, 100]
    pub value: f64,

    /// Discrete 1-9 rating, only on checkpoint records (0 on forced confirm)
    pub rating: Option<u8>,

    pub target: RatingTarget,

    /// Seconds since the first captured sample
    pub elapsed_secs: f64,

    /// Active checkpoint boundary in playback seconds
    pub boundary_secs: f64,

    /// Media position in seconds
    pub playback_secs: f64,

    pub kind: RecordKind,

    /// Free-text note, only on checkpoint records
    pub note: String,

    /// Session-wide record counter, starting at 1
    pub trial: u64,
}

/// Quote a field if it contains a separator, quote or line break.
///
/// Line breaks are replaced by spaces before quoting and embedded quotes
/// are doubled.
pub fn csv_escape(value: &str) -> Cow<'_, str> {
    if !value.contains([',', '"', '\n', '\r']) {
        return Cow::Borrowed(value);
    }

    let flattened = value.replace("\r\n", " ").replace(['\r', '\n'], " ");
    Cow::Owned(format!("\"{}\"", flattened.replace('"', "\"\"")))
}

/// Encode a record plus session metadata as one ratings-file line
pub fn encode_row(meta: &SessionMetadata, record: &SampleRecord) -> String {
    let rating = record.rating.map(|r| r.to_string()).unwrap_or_default();

    let fields: [Cow<'_, str>; 21] = [
        Cow::Borrowed(meta.participant_id.as_str()),
        Cow::Borrowed(meta.partner_id.as_str()),
        Cow::Borrowed(meta.dyad_id.as_str()),
        Cow::Owned(meta.computer.to_string()),
        Cow::Borrowed(meta.subject_initials.as_str()),
        Cow::Borrowed(meta.save_folder.as_str()),
        Cow::Borrowed(meta.ra_name.as_str()),
        Cow::Borrowed(meta.session_time.as_str()),
        Cow::Borrowed(meta.session_date.as_str()),
        Cow::Owned(record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Cow::Owned(meta.task_order.to_string()),
        Cow::Owned(format!("{:.2}", record.value)),
        Cow::Owned(rating),
        Cow::Borrowed(record.target.as_str()),
        Cow::Owned(format!("{:.2}", record.elapsed_secs)),
        Cow::Owned(format!("{:.0}", record.boundary_secs)),
        Cow::Owned(format!("{:.2}", record.playback_secs)),
        Cow::Borrowed(record.kind.flag()),
        Cow::Borrowed(record.note.as_str()),
        Cow::Owned(record.trial.to_string()),
        Cow::Borrowed(meta.schema_version.as_str()),
    ];

    fields
        .iter()
        .map(|field| csv_escape(field))
        .collect::<Vec<_>>()
        .join(",")
}
