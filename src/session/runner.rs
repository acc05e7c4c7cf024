use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::coordinator::{CheckpointConfirmed, Phase, SamplingCoordinator, Termination, WatchOutcome};
use super::events::{Key, SessionEvent, SessionNotice};
use super::flush::FlushWriter;
use super::stats::SessionStats;
use crate::error::SessionError;
use crate::record::SessionMetadata;
use crate::sampling::{PlaybackClock, SampleSource};
use crate::storage::RowSink;

/// Drives a `SamplingCoordinator` from timers and host events
///
/// Everything runs on one task: the capture, watch and flush intervals, the
/// hard timeout and the event channel are multiplexed with `select!`, so
/// coordinator calls never interleave. Only sink writes happen elsewhere,
/// on the `FlushWriter` task.
pub struct SessionRunner {
    config: SessionConfig,
    coordinator: SamplingCoordinator,
    sink: Arc<dyn RowSink>,
    path: PathBuf,
    notices: mpsc::UnboundedSender<SessionNotice>,
}

impl SessionRunner {
    /// Create a runner writing to `path` through `sink`
    ///
    /// Returns the runner and the receiver for UI notices.
    pub fn new(
        config: SessionConfig,
        metadata: SessionMetadata,
        source: Box<dyn SampleSource>,
        clock: Box<dyn PlaybackClock>,
        sink: Arc<dyn RowSink>,
        path: PathBuf,
    ) -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let coordinator = SamplingCoordinator::new(config.clone(), metadata, source, clock);

        let runner = Self {
            config,
            coordinator,
            sink,
            path,
            notices,
        };

        (runner, notice_rx)
    }

    /// Run the phase to completion
    ///
    /// Returns once, after the final flush has settled. A closed event
    /// channel is treated as teardown. Fails before any timer starts if the
    /// config is unusable.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) -> Result<SessionStats> {
        self.config
            .validate()
            .with_context(|| format!("Cannot start session {}", self.config.session_id))?;

        let started_at = Utc::now();
        info!("Starting session runner: {}", self.config.session_id);

        let writer = FlushWriter::spawn(
            Arc::clone(&self.sink),
            self.path.clone(),
            self.config.write_timeout,
        );
        self.notify(SessionNotice::TransitionShown {
            target: self.coordinator.target(),
        });

        let mut capture = time::interval(self.config.capture_period);
        capture.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut watch = time::interval(self.config.watch_period);
        watch.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut flush = time::interval(self.config.flush_period);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let hard_timeout = time::sleep(self.config.hard_timeout);
        tokio::pin!(hard_timeout);

        let termination = loop {
            let ended = tokio::select! {
                _ = capture.tick() => {
                    self.coordinator.capture_tick();
                    None
                }
                _ = watch.tick() => self.on_watch(),
                _ = flush.tick() => {
                    if let Some(rows) = self.coordinator.flush_tick() {
                        writer.submit(rows);
                    }
                    None
                }
                _ = &mut hard_timeout => self.coordinator.hard_timeout(),
                event = events.recv() => match event {
                    Some(event) => self.on_event(event, &writer),
                    None => {
                        warn!("Session event channel closed; tearing down");
                        self.coordinator.teardown()
                    }
                },
            };

            if let Some(termination) = ended {
                break termination;
            }
        };

        // Loops are cancelled together by leaving the select loop.
        let reason = termination.reason;
        let flush_report = writer.finish(termination.rows).await;
        self.notify(SessionNotice::Completed(reason));

        let duration = Utc::now().signed_duration_since(started_at);
        let stats = SessionStats {
            session_id: self.config.session_id.clone(),
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            records_emitted: self.coordinator.records_emitted(),
            checkpoints_completed: self.coordinator.checkpoints_completed(),
            flush: flush_report,
            termination: reason,
        };

        info!(
            "Session runner complete: {} ({:?}, {} records, {} rows lost)",
            stats.session_id, reason, stats.records_emitted, stats.flush.rows_lost
        );

        Ok(stats)
    }

    fn on_watch(&mut self) -> Option<Termination> {
        match self.coordinator.watch_tick() {
            WatchOutcome::Idle => None,
            WatchOutcome::CheckpointOpened { boundary_secs } => {
                self.notify(SessionNotice::CheckpointOpened {
                    boundary_secs,
                    target: self.coordinator.target(),
                });
                None
            }
            WatchOutcome::Ended(termination) => Some(termination),
        }
    }

    fn on_event(&mut self, event: SessionEvent, writer: &FlushWriter) -> Option<Termination> {
        debug!("Session event: {:?}", event);

        match event {
            SessionEvent::TimeUpdate => self.coordinator.time_update(),
            SessionEvent::MediaEnded => self.coordinator.media_ended(),
            SessionEvent::Teardown => self.coordinator.teardown(),
            SessionEvent::KeyPressed(key) => self.on_key(key, writer),
            SessionEvent::NoteChanged(note) => {
                match self.coordinator.form_mut() {
                    Ok(form) => form.set_note(note),
                    Err(e) => debug!("Ignoring note: {}", e),
                }
                None
            }
            SessionEvent::RatingPicked(rating) => {
                let picked = self
                    .coordinator
                    .form_mut()
                    .and_then(|form| form.pick_rating(rating));
                if let Err(e) = picked {
                    self.notify(SessionNotice::InvalidInput(e.to_string()));
                }
                None
            }
            SessionEvent::ConfirmIncomplete => {
                let confirmed = self.coordinator.confirm_incomplete();
                self.on_confirmed(confirmed, writer)
            }
            SessionEvent::DismissIncomplete => {
                if let Err(e) = self.coordinator.dismiss_prompt() {
                    debug!("Ignoring dismiss: {}", e);
                }
                None
            }
        }
    }

    fn on_key(&mut self, key: Key, writer: &FlushWriter) -> Option<Termination> {
        let in_transition = matches!(self.coordinator.phase(), Phase::Transition);
        let in_checkpoint = matches!(self.coordinator.phase(), Phase::Checkpoint(_));

        if in_transition {
            if self.coordinator.continue_key() {
                self.notify(SessionNotice::SamplingStarted {
                    target: self.coordinator.target(),
                });
            }
            return None;
        }

        if in_checkpoint && key == Key::Tab {
            let confirmed = self.coordinator.submit_checkpoint();
            return self.on_confirmed(confirmed, writer);
        }

        None
    }

    fn on_confirmed(
        &mut self,
        confirmed: Result<CheckpointConfirmed, SessionError>,
        writer: &FlushWriter,
    ) -> Option<Termination> {
        match confirmed {
            Ok(confirmed) => {
                if confirmed.termination.is_some() {
                    return confirmed.termination;
                }
                writer.submit(confirmed.rows);
                self.notify(SessionNotice::TransitionShown {
                    target: confirmed.target,
                });
                None
            }
            Err(SessionError::MalformedCheckpointSubmission { has_note }) => {
                self.notify(SessionNotice::IncompleteSubmission { has_note });
                None
            }
            Err(e) => {
                debug!("Ignoring checkpoint confirmation: {}", e);
                None
            }
        }
    }

    fn notify(&self, notice: SessionNotice) {
        if self.notices.send(notice).is_err() {
            debug!("No notice receiver attached");
        }
    }
}
