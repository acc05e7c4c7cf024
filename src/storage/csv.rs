use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::sink::RowSink;
use crate::error::StorageError;
use crate::record::SessionMetadata;

/// File name of the continuous ratings inside a session directory
pub const RATINGS_FILE_NAME: &str = "ratings.csv";

/// Appends rows to a CSV file, writing a header line when it creates the file
#[derive(Debug, Clone)]
pub struct CsvAppender {
    header: Option<String>,
}

impl CsvAppender {
    pub fn new() -> Self {
        Self { header: None }
    }

    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header: Some(header.into()),
        }
    }

    async fn write_batch(&self, path: &Path, rows: &[String]) -> std::io::Result<()> {
        let exists = fs::try_exists(path).await.unwrap_or(false);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        let mut contents = String::new();
        if let (false, Some(header)) = (exists, &self.header) {
            debug!("Creating {} with header", path.display());
            contents.push_str(header);
            contents.push('\n');
        }
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }

        file.write_all(contents.as_bytes()).await?;
        file.flush().await
    }
}

impl Default for CsvAppender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RowSink for CsvAppender {
    async fn append_rows(&self, path: &Path, rows: &[String]) -> Result<(), StorageError> {
        self.write_batch(path, rows)
            .await
            .map_err(|source| StorageError::PersistenceWriteFailed {
                path: path.to_path_buf(),
                rows: rows.len(),
                source,
            })
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Create `<base>/<dyad>_<participant>_<partner>_<initials>/` and return it
pub async fn prepare_session_dir(base: impl AsRef<Path>, meta: &SessionMetadata) -> Result<PathBuf> {
    let dir = base.as_ref().join(format!(
        "{}_{}_{}_{}",
        meta.dyad_id, meta.participant_id, meta.partner_id, meta.subject_initials
    ));

    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create session directory: {:?}", dir))?;

    info!("Session directory ready: {}", dir.display());
    Ok(dir)
}
