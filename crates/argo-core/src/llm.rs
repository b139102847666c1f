//! Answer generator trait

use async_trait::async_trait;

use crate::Result;

/// Trait for hosted language models that turn a grounded prompt into an answer
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Fail with `Error::ConfigurationMissing` when the generator cannot be
    /// called at all, e.g. because no API key is configured. Must not touch
    /// the network.
    fn ensure_configured(&self) -> Result<()>;

    /// Send a single user prompt and return the model's reply verbatim.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
