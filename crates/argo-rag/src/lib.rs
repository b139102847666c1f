//! Ingestion and retrieval engine for Argo RAG
//!
//! This crate provides the row-to-document mapper, the batch ingestion
//! coordinator and the retrieval query engine, plus the concrete
//! collaborators they run against: a SQLite row source, an offline hashing
//! embedder, and local and Qdrant vector indexes.

mod embedder;
mod engine;
mod ingest;
mod mapper;
mod qdrant;
mod source;
mod vector_index;


pub use embedder::HashingEmbedder;
pub use engine::{build_context, build_prompt, RetrievalQueryEngine};
pub use ingest::IngestionCoordinator;
pub use mapper::{render_document_text, RowDocumentMapper};
pub use qdrant::QdrantVectorIndex;
pub use source::SqliteSource;
pub use vector_index::LocalVectorIndex;

// Re-export core types for convenience
pub use argo_core::{
    AnswerGenerator, BatchProgress, CellValue, Document, EmbeddedDocument, Embedder, Error,
    IngestObserver, IngestionReport, LogObserver, MappedCorpus, QueryFailure, QueryFailureKind,
    QueryResult, RagQuery, Result, RetrievedDocument, RowPage, RowSource, TableReport,
    VectorIndex,
};
