// Integration tests for the timer-driven session runner
//
// Tokio time is paused, so interval ticks, the hard timeout and simulated
// playback all advance deterministically as the runtime goes idle.

use anyhow::Result;
use async_trait::async_trait;
use dyad_rating::error::StorageError;
use dyad_rating::record::{ComputerSide, SessionMetadata, RATINGS_HEADER, SCHEMA_VERSION};
use dyad_rating::sampling::{PointerSource, SimulatedPlayback};
use dyad_rating::session::{
    Key, SessionConfig, SessionEvent, SessionNotice, SessionRunner, TerminationReason,
};
use dyad_rating::storage::{CsvAppender, RowSink};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

/// Row sink that keeps every append call in memory
#[derive(Default)]
struct MemorySink {
    calls: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl MemorySink {
    fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    async fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn append_rows(&self, path: &Path, rows: &[String]) -> Result<(), StorageError> {
        self.calls.lock().await.push(rows.to_vec());
        if self.fail {
            return Err(StorageError::PersistenceWriteFailed {
                path: path.to_path_buf(),
                rows: rows.len(),
                source: io::Error::new(io::ErrorKind::Other, "backend offline"),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Row sink whose appends never complete
#[derive(Default)]
struct StalledSink {
    attempts: AtomicUsize,
}

#[async_trait]
impl RowSink for StalledSink {
    async fn append_rows(&self, _path: &Path, _rows: &[String]) -> Result<(), StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

fn metadata() -> SessionMetadata {
    SessionMetadata {
        participant_id: "P01".to_string(),
        partner_id: "P02".to_string(),
        dyad_id: "D1".to_string(),
        computer: ComputerSide::Left,
        subject_initials: "AB".to_string(),
        save_folder: "/tmp/study".to_string(),
        ra_name: "RA".to_string(),
        session_time: "10:00".to_string(),
        session_date: "2025-01-01".to_string(),
        task_order: 1,
        schema_version: SCHEMA_VERSION.to_string(),
    }
}

fn trial(row: &str) -> u64 {
    let cols: Vec<&str> = row.split(',').collect();
    cols[cols.len() - 2].parse().unwrap()
}

fn runner(
    config: SessionConfig,
    playback: &SimulatedPlayback,
    sink: Arc<dyn RowSink>,
    path: PathBuf,
) -> (SessionRunner, mpsc::UnboundedReceiver<SessionNotice>) {
    SessionRunner::new(
        config,
        metadata(),
        Box::new(PointerSource::new(100.0)),
        Box::new(playback.clone()),
        sink,
        path,
    )
}

#[tokio::test(start_paused = true)]
async fn test_hard_timeout_flushes_and_terminates() -> Result<()> {
    let config = SessionConfig {
        hard_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    };
    let playback = SimulatedPlayback::new(Duration::from_secs(600), 1.0);
    let sink = Arc::new(MemorySink::default());
    let (runner, mut notices) = runner(config, &playback, sink.clone(), PathBuf::from("ratings.csv"));

    let (tx, rx) = mpsc::channel(16);
    tx.send(SessionEvent::KeyPressed(Key::Other)).await?;

    let stats = runner.run(rx).await?;

    assert_eq!(stats.termination, TerminationReason::HardTimeout);
    assert_eq!(stats.checkpoints_completed, 0);
    assert!(stats.records_emitted > 0);

    // Flush period is 15s, so everything arrives in the single final flush
    let calls = sink.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len() as u64, stats.records_emitted);
    assert_eq!(stats.flush.rows_written as u64, stats.records_emitted);

    let mut completed = 0;
    while let Ok(notice) = notices.try_recv() {
        if let SessionNotice::Completed(reason) = notice {
            assert_eq!(reason, TerminationReason::HardTimeout);
            completed += 1;
        }
    }
    assert_eq!(completed, 1);

    drop(tx);
    Ok(())
}

// The near-end time update terminates the select loop, so the ended event
// queued behind it is never handed to the coordinator. The coordinator's own
// double-termination guard is covered in coordinator_tests.rs.
#[tokio::test(start_paused = true)]
async fn test_back_to_back_end_signals_complete_once() -> Result<()> {
    let playback = SimulatedPlayback::new(Duration::from_secs(3), 1.0);
    let sink = Arc::new(MemorySink::default());
    let (runner, mut notices) = runner(
        SessionConfig::default(),
        &playback,
        sink.clone(),
        PathBuf::from("ratings.csv"),
    );

    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(runner.run(rx));

    tx.send(SessionEvent::KeyPressed(Key::Other)).await?;
    tokio::time::sleep(Duration::from_millis(1000)).await;

    // Both end signals arrive back to back
    playback.seek(2.8);
    tx.send(SessionEvent::TimeUpdate).await?;
    tx.send(SessionEvent::MediaEnded).await?;

    let stats = handle.await??;
    assert!(matches!(
        stats.termination,
        TerminationReason::NearEnd | TerminationReason::MediaEnded
    ));

    let calls = sink.calls().await;
    assert_eq!(calls.len(), 1, "exactly one final flush");
    assert!(!calls[0].is_empty());

    let mut completed = 0;
    while let Ok(notice) = notices.try_recv() {
        if matches!(notice, SessionNotice::Completed(_)) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_periodic_flush_preserves_order() -> Result<()> {
    let config = SessionConfig {
        flush_period: Duration::from_secs(1),
        ..SessionConfig::default()
    };
    let playback = SimulatedPlayback::new(Duration::from_secs(600), 1.0);
    let sink = Arc::new(MemorySink::default());
    let (runner, _notices) = runner(config, &playback, sink.clone(), PathBuf::from("ratings.csv"));

    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(runner.run(rx));

    tx.send(SessionEvent::KeyPressed(Key::Other)).await?;
    tokio::time::sleep(Duration::from_millis(4500)).await;
    tx.send(SessionEvent::Teardown).await?;

    let stats = handle.await??;
    assert_eq!(stats.termination, TerminationReason::Teardown);

    let calls = sink.calls().await;
    assert!(calls.len() >= 4, "expected periodic batches, got {}", calls.len());

    let trials: Vec<u64> = calls.iter().flatten().map(|r| trial(r)).collect();
    let expected: Vec<u64> = (1..=stats.records_emitted).collect();
    assert_eq!(trials, expected);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_writes_are_counted_not_requeued() -> Result<()> {
    let config = SessionConfig {
        flush_period: Duration::from_secs(1),
        ..SessionConfig::default()
    };
    let playback = SimulatedPlayback::new(Duration::from_secs(600), 1.0);
    let sink = Arc::new(MemorySink::failing());
    let (runner, _notices) = runner(config, &playback, sink.clone(), PathBuf::from("ratings.csv"));

    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(runner.run(rx));

    tx.send(SessionEvent::KeyPressed(Key::Other)).await?;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    drop(tx);

    let stats = handle.await??;
    assert_eq!(stats.termination, TerminationReason::Teardown);
    assert_eq!(stats.flush.rows_written, 0);
    assert_eq!(stats.flush.failures, stats.flush.batches);
    assert_eq!(stats.flush.rows_lost as u64, stats.records_emitted);

    // Each row was submitted exactly once
    let submitted: usize = sink.calls().await.iter().map(Vec::len).sum();
    assert_eq!(submitted as u64, stats.records_emitted);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_checkpoint_flow_writes_csv() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("ratings.csv");

    let config = SessionConfig {
        checkpoint_stride_secs: 2.0,
        max_checkpoints: 2,
        ..SessionConfig::default()
    };
    let playback = SimulatedPlayback::new(Duration::from_secs(600), 1.0);
    let sink: Arc<dyn RowSink> = Arc::new(CsvAppender::with_header(RATINGS_HEADER));
    let (runner, mut notices) = runner(config, &playback, sink, path.clone());

    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(runner.run(rx));

    let mut opened = 0;
    while let Some(notice) = notices.recv().await {
        match notice {
            SessionNotice::TransitionShown { .. } => {
                tx.send(SessionEvent::KeyPressed(Key::Other)).await?;
            }
            SessionNotice::CheckpointOpened { .. } => {
                opened += 1;
                tx.send(SessionEvent::NoteChanged(format!("block {}, \"fine\"", opened)))
                    .await?;
                tx.send(SessionEvent::RatingPicked(opened as u8 + 4)).await?;
                tx.send(SessionEvent::KeyPressed(Key::Tab)).await?;
            }
            SessionNotice::Completed(reason) => {
                assert_eq!(reason, TerminationReason::CheckpointLimit);
                break;
            }
            _ => {}
        }
    }

    let stats = handle.await??;
    assert_eq!(stats.checkpoints_completed, 2);
    assert_eq!(opened, 2);

    let contents = std::fs::read_to_string(&path)?;
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some(RATINGS_HEADER));

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len() as u64, stats.records_emitted);

    let trials: Vec<u64> = rows.iter().map(|r| trial(r)).collect();
    assert_eq!(trials, (1..=stats.records_emitted).collect::<Vec<_>>());

    let checkpoints: Vec<&&str> = rows.iter().filter(|r| r.contains(",1,\"block ")).collect();
    assert_eq!(checkpoints.len(), 2);
    assert!(checkpoints[0].contains(",5,self,"));
    assert!(checkpoints[0].contains(",1,\"block 1, \"\"fine\"\"\","));
    assert!(checkpoints[1].contains(",6,partner,"));

    // The last record is the checkpoint that hit the cap
    assert!(rows.last().unwrap().contains("block 2"));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stalled_sink_still_completes() -> Result<()> {
    let config = SessionConfig {
        hard_timeout: Duration::from_secs(2),
        write_timeout: Duration::from_secs(5),
        ..SessionConfig::default()
    };
    let playback = SimulatedPlayback::new(Duration::from_secs(600), 1.0);
    let sink = Arc::new(StalledSink::default());
    let (runner, mut notices) = runner(config, &playback, sink.clone(), PathBuf::from("ratings.csv"));

    let (tx, rx) = mpsc::channel(16);
    tx.send(SessionEvent::KeyPressed(Key::Other)).await?;

    let stats = tokio::time::timeout(Duration::from_secs(3600), runner.run(rx)).await??;

    assert_eq!(stats.termination, TerminationReason::HardTimeout);
    assert!(stats.records_emitted > 0);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(stats.flush.batches, 1);
    assert_eq!(stats.flush.failures, 1);
    assert_eq!(stats.flush.rows_written, 0);
    assert_eq!(stats.flush.rows_lost as u64, stats.records_emitted);

    let mut completed = 0;
    while let Ok(notice) = notices.try_recv() {
        if matches!(notice, SessionNotice::Completed(TerminationReason::HardTimeout)) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);

    drop(tx);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_zero_capture_period_is_rejected() -> Result<()> {
    let config = SessionConfig {
        capture_period: Duration::ZERO,
        ..SessionConfig::default()
    };
    let playback = SimulatedPlayback::new(Duration::from_secs(600), 1.0);
    let sink = Arc::new(MemorySink::default());
    let (runner, mut notices) = runner(config, &playback, sink.clone(), PathBuf::from("ratings.csv"));

    let (_tx, rx) = mpsc::channel(16);
    let err = tokio::spawn(runner.run(rx)).await?.unwrap_err();

    assert!(format!("{err:#}").contains("capture_period"));
    assert!(sink.calls().await.is_empty());
    assert!(notices.try_recv().is_err());

    Ok(())
}
