use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::events::TerminationReason;
use crate::checkpoint::{CheckpointAnswer, CheckpointForm, CheckpointSchedule};
use crate::error::SessionError;
use crate::record::{encode_row, RatingTarget, RecordKind, SampleRecord, SessionMetadata};
use crate::sampling::{PlaybackClock, SampleBuffer, SampleSource};

/// Where the phase currently is
#[derive(Debug, Clone)]
pub enum Phase {
    /// Waiting on a key press before sampling (re)starts
    Transition,
    Sampling,
    /// Playback paused while the participant fills in the form
    Checkpoint(CheckpointForm),
    Terminated(TerminationReason),
}

/// Why a capture tick produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Playback has not advanced past zero yet
    NotStarted,
    /// A checkpoint or transition screen is showing
    Suspended,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured { trial: u64 },
    Skipped(SkipReason),
}

#[derive(Debug)]
pub enum WatchOutcome {
    Idle,
    CheckpointOpened { boundary_secs: f64 },
    Ended(Termination),
}

/// Returned exactly once per phase, carrying the rows still buffered
#[derive(Debug)]
pub struct Termination {
    pub reason: TerminationReason,
    pub rows: Vec<String>,
}

/// Result of confirming a checkpoint form
#[derive(Debug)]
pub struct CheckpointConfirmed {
    /// Trial number of the checkpoint record
    pub trial: u64,

    /// Rows to persist now, ending with the checkpoint record
    pub rows: Vec<String>,

    /// Rating target for the next block
    pub target: RatingTarget,

    pub next_boundary_secs: f64,

    /// Set when this checkpoint hit the cap; owns the rows in that case
    pub termination: Option<Termination>,
}

/// The sampling engine for one video rating phase
///
/// Owns the buffer, counters and checkpoint schedule. Each `*_tick` and
/// event method runs to completion without yielding, so the host can call
/// them from independent timers on a single task without any locking.
pub struct SamplingCoordinator {
    config: SessionConfig,
    metadata: SessionMetadata,
    source: Box<dyn SampleSource>,
    clock: Box<dyn PlaybackClock>,
    buffer: SampleBuffer,
    schedule: CheckpointSchedule,
    phase: Phase,
    target: RatingTarget,
    next_trial: u64,
    elapsed_origin: Option<Instant>,
    last_value: f64,
}

impl SamplingCoordinator {
    /// Create a coordinator in the opening transition state, playback paused
    pub fn new(
        config: SessionConfig,
        metadata: SessionMetadata,
        source: Box<dyn SampleSource>,
        mut clock: Box<dyn PlaybackClock>,
    ) -> Self {
        clock.pause();

        let target = metadata.computer.initial_target();
        let last_value = source.sample();
        let schedule = CheckpointSchedule::new(config.checkpoint_stride_secs, config.max_checkpoints);

        info!(
            "Sampling coordinator ready: {} (stride {:.0}s, {} checkpoints, starting on {})",
            config.session_id, config.checkpoint_stride_secs, config.max_checkpoints, target
        );

        Self {
            config,
            metadata,
            source,
            clock,
            buffer: SampleBuffer::new(),
            schedule,
            phase: Phase::Transition,
            target,
            next_trial: 1,
            elapsed_origin: None,
            last_value,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn target(&self) -> RatingTarget {
        self.target
    }

    /// Active checkpoint boundary in playback seconds
    pub fn boundary(&self) -> f64 {
        self.schedule.boundary()
    }

    pub fn checkpoints_completed(&self) -> u32 {
        self.schedule.completed()
    }

    pub fn records_emitted(&self) -> u64 {
        self.next_trial - 1
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.phase, Phase::Terminated(_))
    }

    /// Pass the transition gate; returns false outside the transition state
    pub fn continue_key(&mut self) -> bool {
        if !matches!(self.phase, Phase::Transition) {
            return false;
        }

        self.phase = Phase::Sampling;
        self.clock.play();
        info!("Sampling resumed (target: {})", self.target);
        true
    }

    /// Capture one continuous sample into the buffer
    pub fn capture_tick(&mut self) -> CaptureOutcome {
        match self.phase {
            Phase::Sampling => {}
            Phase::Terminated(_) => return CaptureOutcome::Skipped(SkipReason::Terminated),
            Phase::Transition | Phase::Checkpoint(_) => {
                return CaptureOutcome::Skipped(SkipReason::Suspended)
            }
        }

        let position = self.clock.position();
        if position <= 0.0 {
            return CaptureOutcome::Skipped(SkipReason::NotStarted);
        }

        self.schedule.anchor(position);
        if self.elapsed_origin.is_none() {
            self.elapsed_origin = Some(Instant::now());
        }

        let value = self.source.sample();
        self.last_value = value;

        let trial = self.emit(value, None, RecordKind::Continuous, String::new(), position);
        CaptureOutcome::Captured { trial }
    }

    /// Compare playback against the boundary and the media end
    ///
    /// Opens at most one checkpoint per boundary: once the phase leaves
    /// `Sampling`, further calls are no-ops until sampling resumes.
    pub fn watch_tick(&mut self) -> WatchOutcome {
        if !matches!(self.phase, Phase::Sampling) || !self.schedule.is_anchored() {
            return WatchOutcome::Idle;
        }

        if let Some(termination) = self.time_update() {
            return WatchOutcome::Ended(termination);
        }

        let position = self.clock.position();
        if !self.schedule.crossed(position) {
            return WatchOutcome::Idle;
        }

        let boundary_secs = self.schedule.boundary();
        self.clock.pause();
        self.phase = Phase::Checkpoint(CheckpointForm::new());

        info!(
            "Checkpoint {} opened at {:.2}s (boundary {:.0}s, target {})",
            self.schedule.completed() + 1,
            position,
            boundary_secs,
            self.target
        );

        WatchOutcome::CheckpointOpened { boundary_secs }
    }

    /// Drain the buffer for the periodic flush; `None` when there is nothing to write
    pub fn flush_tick(&mut self) -> Option<Vec<String>> {
        if self.buffer.is_empty() {
            return None;
        }

        let rows = self.buffer.drain_all();
        debug!("Flushing {} buffered rows", rows.len());
        Some(rows)
    }

    /// Terminate when playback is within the end epsilon of the media duration
    pub fn time_update(&mut self) -> Option<Termination> {
        let duration = self.clock.duration()?;
        if duration <= 0.0 || self.clock.position() < duration - self.config.end_epsilon_secs {
            return None;
        }
        self.terminate(TerminationReason::NearEnd)
    }

    pub fn media_ended(&mut self) -> Option<Termination> {
        self.terminate(TerminationReason::MediaEnded)
    }

    pub fn hard_timeout(&mut self) -> Option<Termination> {
        self.terminate(TerminationReason::HardTimeout)
    }

    pub fn teardown(&mut self) -> Option<Termination> {
        self.terminate(TerminationReason::Teardown)
    }

    /// Checkpoint form, while a checkpoint is active
    pub fn form_mut(&mut self) -> Result<&mut CheckpointForm, SessionError> {
        match &mut self.phase {
            Phase::Checkpoint(form) => Ok(form),
            _ => Err(SessionError::NotInCheckpoint),
        }
    }

    /// Submit the checkpoint form; fails without a scale value
    pub fn submit_checkpoint(&mut self) -> Result<CheckpointConfirmed, SessionError> {
        let answer = self.form_mut()?.submit()?;
        Ok(self.complete_checkpoint(answer))
    }

    /// Confirm the checkpoint with whatever the participant provided
    pub fn confirm_incomplete(&mut self) -> Result<CheckpointConfirmed, SessionError> {
        let answer = self.form_mut()?.confirm_incomplete();
        Ok(self.complete_checkpoint(answer))
    }

    pub fn dismiss_prompt(&mut self) -> Result<(), SessionError> {
        self.form_mut()?.dismiss_prompt();
        Ok(())
    }

    fn complete_checkpoint(&mut self, answer: CheckpointAnswer) -> CheckpointConfirmed {
        let position = self.clock.position();
        let trial = self.emit(
            self.last_value,
            Some(answer.rating),
            RecordKind::Checkpoint,
            answer.note,
            position,
        );

        self.target = self.target.flipped();
        self.source.recenter();
        let next_boundary_secs = self.schedule.advance();

        info!(
            "Checkpoint {} recorded (trial {}, rating {}); next boundary {:.0}s, target {}",
            self.schedule.completed(),
            trial,
            answer.rating,
            next_boundary_secs,
            self.target
        );

        if self.schedule.limit_reached() {
            let termination = self.terminate(TerminationReason::CheckpointLimit);
            return CheckpointConfirmed {
                trial,
                rows: Vec::new(),
                target: self.target,
                next_boundary_secs,
                termination,
            };
        }

        self.phase = Phase::Transition;

        CheckpointConfirmed {
            trial,
            rows: self.buffer.drain_all(),
            target: self.target,
            next_boundary_secs,
            termination: None,
        }
    }

    fn terminate(&mut self, reason: TerminationReason) -> Option<Termination> {
        if let Phase::Terminated(previous) = self.phase {
            debug!("Ignoring {:?} termination; phase already ended ({:?})", reason, previous);
            return None;
        }

        self.clock.pause();
        self.phase = Phase::Terminated(reason);
        let rows = self.buffer.drain_all();

        if reason == TerminationReason::HardTimeout {
            warn!(
                "Hard timeout reached after {} checkpoints; forcing termination",
                self.schedule.completed()
            );
        }
        info!(
            "Sampling phase ended ({:?}): {} records emitted, {} rows in final flush",
            reason,
            self.records_emitted(),
            rows.len()
        );

        Some(Termination { reason, rows })
    }

    fn emit(
        &mut self,
        value: f64,
        rating: Option<u8>,
        kind: RecordKind,
        note: String,
        playback_secs: f64,
    ) -> u64 {
        let trial = self.next_trial;
        self.next_trial += 1;

        let elapsed_secs = self
            .elapsed_origin
            .map(|origin| origin.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        let record = SampleRecord {
            timestamp: Utc::now(),
            value,
            rating,
            target: self.target,
            elapsed_secs,
            boundary_secs: self.schedule.boundary(),
            playback_secs,
            kind,
            note,
            trial,
        };

        self.buffer.push(encode_row(&self.metadata, &record));
        trial
    }
}
