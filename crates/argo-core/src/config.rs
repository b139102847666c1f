//! Pipeline configuration
//!
//! Values come from environment variables (a `.env` file is honoured) with
//! defaults suited to a single local database file. Credentials for
//! the hosted services are loaded by their own clients in `argo-llm`.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_PAGE_SIZE: usize = 500;
pub const DEFAULT_LIMIT_PER_TABLE: usize = 5000;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_COLLECTION: &str = "argo_data";

/// Where embedded documents are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexBackend {
    /// JSON file on local disk.
    Local { path: PathBuf },
    /// Qdrant server reachable over gRPC.
    Qdrant { url: String },
}

/// Which embedding provider to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Offline feature-hashing embedder.
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hashing" | "hash" | "local" => Ok(EmbedderKind::Hashing),
            "openai" | "open_ai" => Ok(EmbedderKind::OpenAi),
            other => Err(Error::Configuration(format!(
                "unknown embedder '{}'; use hashing or openai",
                other
            ))),
        }
    }
}

/// Configuration for the ingestion and query pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    pub source_path: PathBuf,
    pub index: IndexBackend,
    pub collection: String,
    pub embedder: EmbedderKind,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub batch_size: usize,
    pub page_size: usize,
    /// `None` converts every row of every table.
    pub limit_per_table: Option<usize>,
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/ARGO_DB_2004.sqlite"),
            index: IndexBackend::Local {
                path: PathBuf::from("vector_store/argo_data.json"),
            },
            collection: DEFAULT_COLLECTION.to_string(),
            embedder: EmbedderKind::Hashing,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            limit_per_table: Some(DEFAULT_LIMIT_PER_TABLE),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl RagConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = get("ARGO_DB_PATH") {
            config.source_path = PathBuf::from(path);
        }
        if let Some(collection) = get("ARGO_COLLECTION") {
            config.collection = collection;
        }

        let backend = get("ARGO_INDEX_BACKEND").unwrap_or_else(|| "local".to_string());
        config.index = match backend.to_lowercase().as_str() {
            "local" => IndexBackend::Local {
                path: get("ARGO_INDEX_PATH").map(PathBuf::from).unwrap_or_else(|| {
                    PathBuf::from(format!("vector_store/{}.json", config.collection))
                }),
            },
            "qdrant" => IndexBackend::Qdrant {
                url: get("ARGO_QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".to_string()),
            },
            other => {
                return Err(Error::Configuration(format!(
                    "unknown index backend '{}'; use local or qdrant",
                    other
                )));
            }
        };

        if let Some(kind) = get("ARGO_EMBEDDER") {
            config.embedder = kind.parse()?;
        }
        if let Some(model) = get("ARGO_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(raw) = get("ARGO_EMBEDDING_DIM") {
            config.embedding_dim = parse_positive("ARGO_EMBEDDING_DIM", &raw)?;
        }
        if let Some(raw) = get("ARGO_BATCH_SIZE") {
            config.batch_size = parse_positive("ARGO_BATCH_SIZE", &raw)?;
        }
        if let Some(raw) = get("ARGO_PAGE_SIZE") {
            config.page_size = parse_positive("ARGO_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = get("ARGO_LIMIT_PER_TABLE") {
            config.limit_per_table = parse_limit(&raw)?;
        }
        if let Some(raw) = get("ARGO_TOP_K") {
            config.top_k = parse_positive("ARGO_TOP_K", &raw)?;
        }

        Ok(config)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(0) => Err(Error::Configuration(format!("{} must be greater than zero", key))),
        Ok(value) => Ok(value),
        Err(_) => Err(Error::Configuration(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

/// Parse a per-table row cap. `none`, `all` and `0` mean unlimited.
pub fn parse_limit(raw: &str) -> Result<Option<usize>> {
    match raw.trim().to_lowercase().as_str() {
        "none" | "all" | "unlimited" => Ok(None),
        other => other
            .parse::<usize>()
            .map(|n| (n > 0).then_some(n))
            .map_err(|_| {
                Error::Configuration(format!(
                    "ARGO_LIMIT_PER_TABLE must be a row count or 'none', got '{}'",
                    raw
                ))
            }),
    }
}
