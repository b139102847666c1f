//! RAG query types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TOP_K;

/// Query for RAG retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagQuery {
    pub question: String,
    pub top_k: usize,
}

impl RagQuery {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

impl Default for RagQuery {
    fn default() -> Self {
        Self {
            question: String::new(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Why a query did not produce a generated answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFailureKind {
    /// The index holds no documents yet.
    NoDocuments,
    /// The answer generator has no credential configured.
    MissingCredentials,
    /// The question could not be embedded.
    Embedding,
    /// The vector index could not be reached.
    IndexUnavailable,
    /// Retrieval returned nothing usable as context.
    NoRelevantDocuments,
    /// The answer generator call failed, timed out or returned garbage.
    Generation,
}

impl QueryFailureKind {
    fn marker(self) -> &'static str {
        match self {
            QueryFailureKind::NoDocuments
            | QueryFailureKind::MissingCredentials
            | QueryFailureKind::NoRelevantDocuments => "⚠️",
            _ => "❌",
        }
    }
}

/// A recoverable query outcome, rendered as a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub kind: QueryFailureKind,
    pub detail: String,
}

impl QueryFailure {
    pub fn new(kind: QueryFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.marker(), self.detail)
    }
}

impl std::error::Error for QueryFailure {}

/// Generated answer, or the reason there is none.
pub type QueryResult = std::result::Result<String, QueryFailure>;
