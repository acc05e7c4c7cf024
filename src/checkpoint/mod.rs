//! Checkpoint interruptions
//!
//! The scheduler decides *when* playback is interrupted for a discrete
//! rating; the form collects the rating itself.

mod form;
mod scheduler;

pub use form::{CheckpointAnswer, CheckpointForm, RATING_MAX, RATING_MIN};
pub use scheduler::{next_boundary, CheckpointSchedule};
