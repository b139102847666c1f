//! Embedding provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for embedding providers
///
/// `embed` is positional: the i-th output vector belongs to the i-th input
/// text, and the output has exactly as many vectors as there are inputs.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Compute embeddings for a batch of input texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Stable identifier for the provider/model.
    fn model_id(&self) -> &str;
}
