//! Batch ingestion coordinator

use std::sync::Arc;

use argo_core::{
    BatchProgress, Document, EmbeddedDocument, Embedder, Error, IngestObserver, IngestionReport,
    Result, VectorIndex,
};

/// Embeds documents batch by batch and upserts them into a vector index.
///
/// Batches are contiguous slices in document order and are processed one at
/// a time. Any embedding or index failure aborts the run; batches stored
/// before the failure stay stored, and a re-run overwrites them by id. The
/// index is flushed once when the run ends, whether or not it succeeded.
pub struct IngestionCoordinator<E: ?Sized, V: ?Sized> {
    embedder: Arc<E>,
    index: Arc<V>,
    batch_size: usize,
}

impl<E, V> IngestionCoordinator<E, V>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    pub fn new(embedder: Arc<E>, index: Arc<V>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidInput(
                "batch size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            embedder,
            index,
            batch_size,
        })
    }

    /// Embed and store every document, notifying `observer` after each batch.
    pub async fn ingest(
        &self,
        documents: &[Document],
        observer: &dyn IngestObserver,
    ) -> Result<IngestionReport> {
        let stored = self.store_batches(documents, observer).await;
        let flushed = self.index.flush().await;
        let report = stored?;
        flushed?;

        tracing::info!(
            batches = report.batches,
            documents = report.documents,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn store_batches(
        &self,
        documents: &[Document],
        observer: &dyn IngestObserver,
    ) -> Result<IngestionReport> {
        let total_batches = documents.len().div_ceil(self.batch_size);
        let mut report = IngestionReport::default();

        for (i, batch) in documents.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let embeddings = self.embedder.embed(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "{} returned {} embeddings for {} documents in batch {}",
                    self.embedder.model_id(),
                    embeddings.len(),
                    batch.len(),
                    i + 1
                )));
            }

            let records: Vec<EmbeddedDocument> = batch
                .iter()
                .zip(embeddings)
                .map(|(doc, embedding)| EmbeddedDocument::new(doc, embedding))
                .collect();
            self.index.upsert(&records).await?;

            report.batches += 1;
            report.documents += batch.len();
            observer.batch_stored(&BatchProgress {
                batch: i + 1,
                total_batches,
                documents: batch.len(),
                stored: report.documents,
            });
        }
        Ok(report)
    }
}
