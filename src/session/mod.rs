//! Video rating phase
//!
//! This module provides the sampling engine and its async driver:
//! - `SamplingCoordinator`: buffer, counters, checkpoint schedule and phase state
//! - `SessionRunner`: capture, watch and flush timers plus the hard timeout
//! - `FlushWriter`: ordered, non-blocking hand-off of rows to a `RowSink`
//! - Session events, UI notices and final statistics

mod config;
mod coordinator;
mod events;
mod flush;
mod runner;
mod stats;

pub use config::SessionConfig;
pub use coordinator::{
    CaptureOutcome, CheckpointConfirmed, Phase, SamplingCoordinator, SkipReason, Termination,
    WatchOutcome,
};
pub use events::{Key, SessionEvent, SessionNotice, TerminationReason};
pub use flush::FlushWriter;
pub use runner::SessionRunner;
pub use stats::{FlushReport, SessionStats};
