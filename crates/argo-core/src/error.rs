//! Error types for Argo RAG

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Argo RAG pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// The relational source could not be opened or enumerated.
    #[error("Source read error: {0}")]
    SourceRead(String),

    /// A single table could not be read. The mapper recovers from this one.
    #[error("Failed to read table '{table}': {detail}")]
    TableRead { table: String, detail: String },

    #[error("Embedding failure: {0}")]
    Embedding(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Answer generator returned HTTP {status}: {body}")]
    GenerationStatus { status: u16, body: String },

    #[error("Answer generator request timed out after {}s", .0.as_secs())]
    GenerationTimeout(Duration),

    #[error("Unexpected answer generator response: {0}")]
    GenerationResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    /// A required credential is absent. Raised before any network call.
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of the answer generator call itself.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            Error::GenerationStatus { .. }
                | Error::GenerationTimeout(_)
                | Error::GenerationResponse(_)
                | Error::Network(_)
        )
    }
}
