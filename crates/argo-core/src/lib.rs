//! Core traits and types for Argo RAG
//!
//! This crate defines the data model shared by the ingestion and query paths,
//! the error taxonomy, and the capability-facing interfaces for the external
//! collaborators: relational row sources, embedding providers, vector indexes
//! and answer generators. Concrete implementations live in `argo-rag` and
//! `argo-llm`, which keeps the pipeline test-friendly.

pub mod config;
pub mod embedder;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod source;
pub mod types;
pub mod vector_index;


pub use config::{
    EmbedderKind, IndexBackend, RagConfig, DEFAULT_BATCH_SIZE, DEFAULT_LIMIT_PER_TABLE,
    DEFAULT_PAGE_SIZE, DEFAULT_TOP_K,
};
pub use embedder::Embedder;
pub use error::{Error, Result};
pub use ingest::{BatchProgress, IngestObserver, IngestionReport, LogObserver};
pub use llm::AnswerGenerator;
pub use rag::{QueryFailure, QueryFailureKind, QueryResult, RagQuery};
pub use source::{CellValue, RowPage, RowSource};
pub use types::{Document, MappedCorpus, TableReport};
pub use vector_index::{EmbeddedDocument, RetrievedDocument, VectorIndex};
