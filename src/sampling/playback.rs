use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::session::SessionEvent;

/// Read access to the media element's clock plus play/pause control
///
/// Positions and durations are in seconds of media time.
pub trait PlaybackClock: Send {
    /// Current play position
    fn position(&self) -> f64;

    /// Total media length, if known yet
    fn duration(&self) -> Option<f64>;

    fn pause(&mut self);

    fn play(&mut self);

    fn is_paused(&self) -> bool;
}

#[derive(Debug)]
struct PlaybackState {
    /// Position accumulated over earlier playing windows
    baseline_secs: f64,
    /// Set while playing; combines with `baseline_secs` to give the live position
    running_anchor: Option<Instant>,
    rate: f64,
    duration_secs: f64,
}

impl PlaybackState {
    fn position(&self) -> f64 {
        let live = match self.running_anchor {
            Some(anchor) => self.baseline_secs + anchor.elapsed().as_secs_f64() * self.rate,
            None => self.baseline_secs,
        };
        live.min(self.duration_secs)
    }
}

/// Headless stand-in for a video element
///
/// Advances media time at `rate` times wall-clock speed while playing and
/// stops at `duration`. Clones share the same clock, so one copy can be
/// owned by the sampling engine while another pumps media events.
#[derive(Debug, Clone)]
pub struct SimulatedPlayback {
    state: Arc<Mutex<PlaybackState>>,
}

impl SimulatedPlayback {
    /// Create a paused clock at position zero
    pub fn new(duration: Duration, rate: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlaybackState {
                baseline_secs: 0.0,
                running_anchor: None,
                rate: rate.max(0.0),
                duration_secs: duration.as_secs_f64(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Jump to `secs`, keeping the current play state
    pub fn seek(&self, secs: f64) {
        let mut state = self.lock();
        state.baseline_secs = secs.clamp(0.0, state.duration_secs);
        if state.running_anchor.is_some() {
            state.running_anchor = Some(Instant::now());
        }
    }

    pub fn has_ended(&self) -> bool {
        let state = self.lock();
        state.position() >= state.duration_secs
    }

    /// Emit `TimeUpdate` every `period` and one `Ended` when the clock reaches its duration
    ///
    /// The task exits after `Ended` or once the receiver is dropped.
    pub fn spawn_media_events(
        &self,
        events: mpsc::Sender<SessionEvent>,
        period: Duration,
    ) -> JoinHandle<()> {
        let clock = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;

                if clock.has_ended() {
                    info!("Simulated media reached its end");
                    let _ = events.send(SessionEvent::MediaEnded).await;
                    break;
                }

                if events.send(SessionEvent::TimeUpdate).await.is_err() {
                    debug!("Session event channel closed; stopping media events");
                    break;
                }
            }
        })
    }
}

impl PlaybackClock for SimulatedPlayback {
    fn position(&self) -> f64 {
        self.lock().position()
    }

    fn duration(&self) -> Option<f64> {
        Some(self.lock().duration_secs)
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        if state.running_anchor.is_some() {
            state.baseline_secs = state.position();
            state.running_anchor = None;
        }
    }

    fn play(&mut self) {
        let mut state = self.lock();
        if state.running_anchor.is_none() {
            state.running_anchor = Some(Instant::now());
        }
    }

    fn is_paused(&self) -> bool {
        self.lock().running_anchor.is_none()
    }
}
