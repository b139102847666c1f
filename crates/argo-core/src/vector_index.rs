//! Vector index trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Document, Result};

/// A document together with its embedding, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDocument {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl EmbeddedDocument {
    pub fn new(document: &Document, embedding: Vec<f32>) -> Self {
        Self {
            id: document.id.clone(),
            text: document.text.clone(),
            embedding,
        }
    }
}

/// One ranked hit from a k-NN query. Higher scores rank first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// Trait for vector indexes (e.g., a local file-backed index, Qdrant)
///
/// Writes are upserts keyed by `EmbeddedDocument::id`: storing the same id
/// twice overwrites, never duplicates. Unreachable backends report
/// `Error::IndexUnavailable`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite documents by id.
    async fn upsert(&self, documents: &[EmbeddedDocument]) -> Result<()>;

    /// Return up to `k` documents nearest to `embedding`, best first.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize>;

    /// Make every upsert so far durable. Called once at the end of an
    /// ingestion run; backends that write through on upsert keep the default.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
