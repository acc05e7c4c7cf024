use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

use super::stats::FlushReport;
use crate::error::StorageError;
use crate::storage::RowSink;

/// Batches queued but not yet settled by the writer task
#[derive(Debug, Default)]
struct Pending {
    batches: usize,
    rows: usize,
}

/// Background writer that hands batches to a row sink in submission order
///
/// `submit` never waits on the sink, so the capture cadence is not stalled
/// by slow storage. Batches are appended one at a time by a single task,
/// which keeps file order equal to capture order. Every append is bounded
/// by the write timeout. Failed or timed-out batches are logged and
/// counted, never re-queued.
pub struct FlushWriter {
    batch_tx: mpsc::UnboundedSender<Vec<String>>,
    handle: JoinHandle<FlushReport>,
    pending: Arc<Mutex<Pending>>,
    report: Arc<Mutex<FlushReport>>,
    write_timeout: Duration,
}

impl FlushWriter {
    pub fn spawn(sink: Arc<dyn RowSink>, path: PathBuf, write_timeout: Duration) -> Self {
        let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<Vec<String>>();
        let pending = Arc::new(Mutex::new(Pending::default()));
        let report = Arc::new(Mutex::new(FlushReport::default()));

        let task_pending = Arc::clone(&pending);
        let task_report = Arc::clone(&report);
        let handle = tokio::spawn(async move {
            info!("Flush writer started: {} -> {}", sink.name(), path.display());

            while let Some(rows) = batch_rx.recv().await {
                let append = sink.append_rows(&path, &rows);
                let written = match time::timeout(write_timeout, append).await {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::TimedOut {
                        path: path.clone(),
                        rows: rows.len(),
                        after: write_timeout,
                    }),
                };

                let mut report = task_report.lock().unwrap_or_else(PoisonError::into_inner);
                report.batches += 1;
                match written {
                    Ok(()) => {
                        debug!("Appended {} rows to {}", rows.len(), path.display());
                        report.rows_written += rows.len();
                    }
                    Err(e) => {
                        error!("Row sink write failed, {} rows dropped: {}", rows.len(), e);
                        report.failures += 1;
                        report.rows_lost += rows.len();
                    }
                }
                drop(report);

                let mut pending = task_pending.lock().unwrap_or_else(PoisonError::into_inner);
                pending.batches -= 1;
                pending.rows -= rows.len();
            }

            let report = task_report.lock().unwrap_or_else(PoisonError::into_inner).clone();
            info!(
                "Flush writer stopped: {} batches, {} rows written, {} failed batches",
                report.batches, report.rows_written, report.failures
            );
            report
        });

        Self {
            batch_tx,
            handle,
            pending,
            report,
            write_timeout,
        }
    }

    /// Queue a batch for appending; empty batches are ignored
    pub fn submit(&self, rows: Vec<String>) {
        if rows.is_empty() {
            return;
        }

        let count = rows.len();
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.batches += 1;
            pending.rows += count;
        }

        if self.batch_tx.send(rows).is_err() {
            error!("Flush writer is gone; {} rows dropped", count);
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.batches -= 1;
            pending.rows -= count;
        }
    }

    /// Queue the final batch and wait until every submitted batch has settled
    ///
    /// The wait is bounded by one write timeout per queued batch plus one.
    /// Batches still unsettled when it runs out are counted as lost.
    pub async fn finish(self, final_rows: Vec<String>) -> FlushReport {
        self.submit(final_rows);
        drop(self.batch_tx); // Close channel to signal writer to stop

        let queued = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .batches;
        let deadline = self
            .write_timeout
            .saturating_mul(u32::try_from(queued + 1).unwrap_or(u32::MAX));

        let mut handle = self.handle;
        match time::timeout(deadline, &mut handle).await {
            Ok(Ok(report)) => return report,
            Ok(Err(e)) => error!("Flush writer panicked: {}", e),
            Err(_) => {
                error!("Flush writer did not settle within {:?}; abandoning", deadline);
                handle.abort();
            }
        }

        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        report.batches += pending.batches;
        report.failures += pending.batches;
        report.rows_lost += pending.rows;
        report
    }
}
