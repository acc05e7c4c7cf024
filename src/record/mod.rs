//! Persisted session records
//!
//! Every observation written during the video phase, continuous or
//! checkpoint-terminal, goes through the same row encoder so the column
//! layout is identical across the whole ratings file.

mod metadata;
mod row;

pub use metadata::{ComputerSide, RatingTarget, SessionMetadata, SCHEMA_VERSION};
pub use row::{csv_escape, encode_row, RecordKind, SampleRecord, RATINGS_HEADER};
