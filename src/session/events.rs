use serde::Serialize;

use crate::record::RatingTarget;

/// Keys the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Submits the checkpoint form
    Tab,
    /// Any other key; passes the transition gate
    Other,
}

/// Input delivered to a running session by the media element and the UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Media position changed
    TimeUpdate,
    /// Media reached its end
    MediaEnded,
    KeyPressed(Key),
    NoteChanged(String),
    RatingPicked(u8),
    /// Answer "continue" on the incomplete-submission prompt
    ConfirmIncomplete,
    /// Answer "close" on the incomplete-submission prompt
    DismissIncomplete,
    /// Host is tearing the phase down (window closed, task aborted)
    Teardown,
}

/// Why a phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MediaEnded,
    /// Time update within the end epsilon of the media duration
    NearEnd,
    HardTimeout,
    CheckpointLimit,
    Teardown,
}

/// What the host UI should present; emitted by the session runner
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    SamplingStarted { target: RatingTarget },
    CheckpointOpened { boundary_secs: f64, target: RatingTarget },
    /// Submit without a scale value; ask whether to continue anyway
    IncompleteSubmission { has_note: bool },
    InvalidInput(String),
    /// Checkpoint recorded; waiting on a key press before sampling resumes
    TransitionShown { target: RatingTarget },
    Completed(TerminationReason),
}
