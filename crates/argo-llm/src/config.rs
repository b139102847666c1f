//! Hosted model configuration

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use argo_core::{Error, Result};

pub const DEFAULT_PERPLEXITY_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_PERPLEXITY_MODEL: &str = "sonar";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Configuration for the Perplexity answer generator
///
/// A missing API key is not an error here; the query engine reports it
/// before any request is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerplexityConfig {
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_PERPLEXITY_MODEL.to_string(),
            api_url: DEFAULT_PERPLEXITY_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl PerplexityConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let api_url = get("PERPLEXITY_API_URL").unwrap_or(defaults.api_url);
        validate_url("PERPLEXITY_API_URL", &api_url)?;

        Ok(Self {
            api_key: get("PERPLEXITY_API_KEY"),
            model: get("PERPLEXITY_MODEL").unwrap_or(defaults.model),
            api_url,
            timeout_secs: match get("PERPLEXITY_TIMEOUT_SECS") {
                Some(raw) => parse_secs("PERPLEXITY_TIMEOUT_SECS", &raw)?,
                None => defaults.timeout_secs,
            },
        })
    }

    /// Create configuration with an explicit key and default endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiEmbeddingConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Requested output width; `None` uses the model's native size.
    pub dimensions: Option<usize>,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl OpenAiEmbeddingConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("OPENAI_API_KEY").ok_or_else(|| {
            Error::ConfigurationMissing(
                "OPENAI_API_KEY is required for the openai embedder".to_string(),
            )
        })?;
        let base_url = get("ARGO_EMBEDDING_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        validate_url("ARGO_EMBEDDING_BASE_URL", &base_url)?;

        let mut config = Self::new(api_key);
        config.base_url = base_url;
        if let Some(model) = get("ARGO_EMBEDDING_MODEL") {
            config.model = model;
        }
        if let Some(raw) = get("ARGO_EMBEDDING_TIMEOUT_SECS") {
            config.timeout_secs = parse_secs("ARGO_EMBEDDING_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = get("ARGO_EMBEDDING_DIMENSIONS") {
            config.dimensions = match raw.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(Error::Configuration(format!(
                        "ARGO_EMBEDDING_DIMENSIONS must be a positive integer, got '{}'",
                        raw
                    )));
                }
            };
        }
        if let Some(raw) = get("ARGO_EMBEDDING_MAX_RETRIES") {
            config.max_retries = raw.parse().map_err(|_| {
                Error::Configuration(format!(
                    "ARGO_EMBEDDING_MAX_RETRIES must be a non-negative integer, got '{}'",
                    raw
                ))
            })?;
        }
        Ok(config)
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
            dimensions: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn validate_url(key: &str, raw: &str) -> Result<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| Error::Configuration(format!("{} is not a valid URL ({}): {}", key, e, raw)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Configuration(format!(
            "{} must use http or https, got '{}'",
            key, other
        ))),
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(Error::Configuration(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, raw
        ))),
    }
}
