//! Common types used across the Argo RAG pipeline

use serde::{Deserialize, Serialize};

/// A flat text document derived from one source row.
///
/// `id` is `"{table}_{ordinal}"` and doubles as the vector index storage key,
/// so re-deriving the same row always overwrites the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Stable document id for the `ordinal`-th row of `table`.
    pub fn row_id(table: &str, ordinal: usize) -> String {
        format!("{}_{}", table, ordinal)
    }
}

/// Per-table accounting produced by the row mapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub documents: usize,
    /// The row cap was hit and paging stopped early.
    pub truncated: bool,
    /// Read error that ended this table early, if any.
    pub error: Option<String>,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            documents: 0,
            truncated: false,
            error: None,
        }
    }
}

/// Everything the mapper produced for one source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappedCorpus {
    pub documents: Vec<Document>,
    pub tables: Vec<TableReport>,
}

impl MappedCorpus {
    pub fn failed_tables(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| t.error.is_some())
    }

    pub fn truncated_tables(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| t.truncated)
    }
}
