//! OpenAI-compatible embeddings client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use argo_core::{Embedder, Error, Result};

use crate::config::OpenAiEmbeddingConfig;

/// Embedding provider that calls `{base_url}/embeddings`.
///
/// Rate limits, server errors and transport failures are retried with
/// exponential backoff up to `max_retries` extra attempts.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    max_retries: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiEmbeddingConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::ConfigurationMissing(
                "OPENAI_API_KEY is required for the openai embedder".to_string(),
            ));
        }
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|_| Error::Configuration("invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            model: config.model,
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiEmbeddingConfig::from_env()?)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        let mut attempt = 0usize;
        loop {
            let failure = match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if status.is_success() {
                        return parse_embeddings(&body, texts.len());
                    }
                    if !should_retry(status) {
                        return Err(Error::Embedding(format!(
                            "embeddings request failed ({}): {}",
                            status, body
                        )));
                    }
                    format!("embeddings request failed ({}): {}", status, body)
                }
                Err(e) => {
                    if !is_retryable_error(&e) {
                        return Err(Error::Embedding(e.to_string()));
                    }
                    e.to_string()
                }
            };

            if attempt >= self.max_retries {
                return Err(Error::Embedding(failure));
            }
            attempt += 1;
            let delay = retry_backoff(attempt);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying embeddings request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Decode an embeddings response, restoring input order from `index`.
fn parse_embeddings(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| Error::Embedding(format!("failed to parse embeddings response: {}", e)))?;
    parsed.data.sort_by_key(|entry| entry.index);
    if parsed.data.len() != expected {
        return Err(Error::Embedding(format!(
            "provider returned {} embeddings for {} inputs",
            parsed.data.len(),
            expected
        )));
    }
    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}
