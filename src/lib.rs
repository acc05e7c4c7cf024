pub mod checkpoint;
pub mod config;
pub mod console;
pub mod error;
pub mod record;
pub mod sampling;
pub mod session;
pub mod storage;

pub use checkpoint::{next_boundary, CheckpointAnswer, CheckpointForm, CheckpointSchedule};
pub use config::Config;
pub use error::{SessionError, StorageError};
pub use record::{
    csv_escape, encode_row, ComputerSide, RatingTarget, RecordKind, SampleRecord, SessionMetadata,
    RATINGS_HEADER,
};
pub use sampling::{PlaybackClock, PointerHandle, PointerSource, SampleBuffer, SampleSource, SimulatedPlayback};
pub use session::{
    SamplingCoordinator, SessionConfig, SessionEvent, SessionNotice, SessionRunner, SessionStats,
    TerminationReason,
};
pub use storage::{prepare_session_dir, CsvAppender, RowSink};
