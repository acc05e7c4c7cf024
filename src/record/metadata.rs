use serde::{Deserialize, Serialize};
use std::fmt;

/// Version string stamped on every persisted row
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Which of the two dyad workstations the participant sits at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputerSide {
    Left,
    Right,
}

impl ComputerSide {
    /// Left starts by rating their own feelings, right starts with the partner
    pub fn initial_target(self) -> RatingTarget {
        match self {
            ComputerSide::Left => RatingTarget::SelfRating,
            ComputerSide::Right => RatingTarget::Partner,
        }
    }
}

impl fmt::Display for ComputerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputerSide::Left => f.write_str("Left"),
            ComputerSide::Right => f.write_str("Right"),
        }
    }
}

/// Whose feelings the current sampling block concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingTarget {
    #[serde(rename = "self")]
    SelfRating,
    Partner,
}

impl RatingTarget {
    pub fn flipped(self) -> Self {
        match self {
            RatingTarget::SelfRating => RatingTarget::Partner,
            RatingTarget::Partner => RatingTarget::SelfRating,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RatingTarget::SelfRating => "self",
            RatingTarget::Partner => "partner",
        }
    }
}

impl fmt::Display for RatingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Participant and session identifiers, fixed for the lifetime of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub participant_id: String,
    pub partner_id: String,
    pub dyad_id: String,
    pub computer: ComputerSide,
    pub subject_initials: String,
    pub save_folder: String,
    pub ra_name: String,
    pub session_time: String,
    pub session_date: String,

    /// Position of the video task within the session (1 = first task)
    #[serde(default = "default_task_order")]
    pub task_order: u32,

    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_task_order() -> u32 {
    1
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}
