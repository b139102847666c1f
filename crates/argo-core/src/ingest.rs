//! Ingestion progress reporting

use serde::{Deserialize, Serialize};

/// Progress after one batch has been stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// 1-based batch number.
    pub batch: usize,
    pub total_batches: usize,
    /// Documents in this batch.
    pub documents: usize,
    /// Documents stored so far in this run, this batch included.
    pub stored: usize,
}

/// Result of a completed ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub batches: usize,
    pub documents: usize,
}

/// Receives progress notifications from the ingestion coordinator
pub trait IngestObserver: Send + Sync {
    fn batch_stored(&self, progress: &BatchProgress);
}

/// Observer that reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl IngestObserver for LogObserver {
    fn batch_stored(&self, progress: &BatchProgress) {
        tracing::info!(
            batch = progress.batch,
            total_batches = progress.total_batches,
            documents = progress.documents,
            stored = progress.stored,
            "stored batch"
        );
    }
}
