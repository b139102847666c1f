//! Hosted model clients for Argo RAG
//!
//! This crate provides the Perplexity implementation of the
//! `AnswerGenerator` trait and an OpenAI-compatible `Embedder`.

mod client;
mod config;
mod embeddings;


pub use client::{parse_completion, PerplexityClient};
pub use config::{OpenAiEmbeddingConfig, PerplexityConfig};
pub use embeddings::OpenAiEmbedder;

// Re-export core types for convenience
pub use argo_core::{AnswerGenerator, Embedder, Error, Result};
