use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::record::SessionMetadata;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub participant: SessionMetadata,
    #[serde(default)]
    pub task: TaskConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub capture_period_ms: u64,
    pub watch_period_ms: u64,
    pub flush_period_secs: u64,
    pub hard_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub checkpoint_stride_secs: f64,
    pub max_checkpoints: u32,
    pub end_epsilon_secs: f64,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Root under which per-session directories are created; `~` is expanded
    pub output_root: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            capture_period_ms: defaults.capture_period.as_millis() as u64,
            watch_period_ms: defaults.watch_period.as_millis() as u64,
            flush_period_secs: defaults.flush_period.as_secs(),
            hard_timeout_secs: defaults.hard_timeout.as_secs(),
            write_timeout_secs: defaults.write_timeout.as_secs(),
            checkpoint_stride_secs: defaults.checkpoint_stride_secs,
            max_checkpoints: defaults.max_checkpoints,
            end_epsilon_secs: defaults.end_epsilon_secs,
        }
    }
}

impl TaskConfig {
    /// Build the runner's timing config, rejecting values it cannot run with
    pub fn session_config(&self) -> Result<SessionConfig> {
        let session = SessionConfig {
            capture_period: Duration::from_millis(self.capture_period_ms),
            watch_period: Duration::from_millis(self.watch_period_ms),
            flush_period: Duration::from_secs(self.flush_period_secs),
            hard_timeout: Duration::from_secs(self.hard_timeout_secs),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
            checkpoint_stride_secs: self.checkpoint_stride_secs,
            max_checkpoints: self.max_checkpoints,
            end_epsilon_secs: self.end_epsilon_secs,
            ..SessionConfig::default()
        };

        session.validate().context("invalid [task] configuration")?;
        Ok(session)
    }
}

impl StorageConfig {
    pub fn output_root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output_root).into_owned())
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_task_config_converts() {
        let session = TaskConfig::default().session_config().unwrap();
        assert_eq!(session.capture_period, Duration::from_millis(100));
        assert_eq!(session.write_timeout, Duration::from_secs(10));
        assert_eq!(session.checkpoint_stride_secs, 150.0);
    }

    #[test]
    fn test_zero_capture_period_rejected() {
        let task = TaskConfig {
            capture_period_ms: 0,
            ..TaskConfig::default()
        };
        let err = task.session_config().unwrap_err();
        assert!(format!("{err:#}").contains("capture_period"));
    }

    #[test]
    fn test_zero_watch_period_rejected() {
        let task = TaskConfig {
            watch_period_ms: 0,
            ..TaskConfig::default()
        };
        assert!(task.session_config().is_err());
    }

    #[test]
    fn test_zero_flush_period_rejected() {
        let task = TaskConfig {
            flush_period_secs: 0,
            ..TaskConfig::default()
        };
        assert!(task.session_config().is_err());
    }

    #[test]
    fn test_zero_stride_rejected() {
        let task = TaskConfig {
            checkpoint_stride_secs: 0.0,
            ..TaskConfig::default()
        };
        let err = task.session_config().unwrap_err();
        assert!(format!("{err:#}").contains("checkpoint_stride_secs"));
    }
}
