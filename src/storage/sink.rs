use std::path::Path;

use crate::error::StorageError;

/// Append-only row writer
///
/// Implementations must preserve row order within and across calls and
/// tolerate being called repeatedly with small batches.
#[async_trait::async_trait]
pub trait RowSink: Send + Sync {
    /// Append `rows` to the record store at `path`
    async fn append_rows(&self, path: &Path, rows: &[String]) -> Result<(), StorageError>;

    /// Get sink name for logging
    fn name(&self) -> &str;
}
