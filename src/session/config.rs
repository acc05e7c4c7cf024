use anyhow::{bail, Result};
use std::time::Duration;

/// Timing and limits for one video rating phase
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identifier used in log lines (e.g., "session-3f2a…")
    pub session_id: String,

    /// How often the continuous value is captured
    /// Default: 100ms
    pub capture_period: Duration,

    /// How often playback is compared against the checkpoint boundary
    /// Default: 50ms
    pub watch_period: Duration,

    /// How often buffered rows are handed to the row sink
    /// Default: 15 seconds
    pub flush_period: Duration,

    /// Upper bound on the phase; forces a final flush and termination when hit
    /// Default: 3 hours
    pub hard_timeout: Duration,

    /// Longest a single row-sink append may take before the batch counts as failed
    /// Default: 10 seconds
    pub write_timeout: Duration,

    /// Playback seconds between checkpoints
    pub checkpoint_stride_secs: f64,

    /// Checkpoints after which the phase ends regardless of playback
    pub max_checkpoints: u32,

    /// Playback within this many seconds of the media duration counts as ended
    pub end_epsilon_secs: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            capture_period: Duration::from_millis(100),
            watch_period: Duration::from_millis(50),
            flush_period: Duration::from_secs(15),
            hard_timeout: Duration::from_secs(3 * 60 * 60),
            write_timeout: Duration::from_secs(10),
            checkpoint_stride_secs: 150.0,
            max_checkpoints: 4,
            end_epsilon_secs: 0.5,
        }
    }
}

impl SessionConfig {
    /// Reject values the timers or the checkpoint schedule cannot run with
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("capture_period", self.capture_period),
            ("watch_period", self.watch_period),
            ("flush_period", self.flush_period),
            ("write_timeout", self.write_timeout),
        ];
        for (name, period) in periods {
            if period.is_zero() {
                bail!("{} must be greater than zero", name);
            }
        }

        if !self.checkpoint_stride_secs.is_finite() || self.checkpoint_stride_secs <= 0.0 {
            bail!(
                "checkpoint_stride_secs must be a finite positive number, got {}",
                self.checkpoint_stride_secs
            );
        }

        if !self.end_epsilon_secs.is_finite() || self.end_epsilon_secs < 0.0 {
            bail!(
                "end_epsilon_secs must be a finite non-negative number, got {}",
                self.end_epsilon_secs
            );
        }

        Ok(())
    }
}
