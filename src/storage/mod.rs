//! Append-only persistence for encoded rows
//!
//! The sampling engine only ever calls `RowSink::append_rows`; the sink owns
//! file handling, header emission and directory layout.

mod csv;
mod sink;

pub use csv::{prepare_session_dir, CsvAppender, RATINGS_FILE_NAME};
pub use sink::RowSink;
