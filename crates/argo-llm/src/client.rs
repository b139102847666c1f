//! Perplexity chat-completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use argo_core::{AnswerGenerator, Error, Result};

use crate::config::PerplexityConfig;

/// Answer generator backed by the Perplexity chat-completions API
pub struct PerplexityClient {
    config: PerplexityConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

impl PerplexityClient {
    /// Create a new client from configuration
    pub fn new(config: PerplexityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(PerplexityConfig::from_env()?)
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::ConfigurationMissing(
                    "Perplexity API key not set. Add PERPLEXITY_API_KEY to your environment or .env file."
                        .to_string(),
                )
            })
    }

    async fn perform_request(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        parse_completion(status, &text)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::GenerationTimeout(self.config.timeout())
        } else {
            Error::Network(format!("Perplexity request failed: {}", e))
        }
    }
}

/// Interpret a chat-completions response.
///
/// Only HTTP 200 with `choices[0].message.content` is an answer; any other
/// status carries its body back in the error.
pub fn parse_completion(status: u16, body: &str) -> Result<String> {
    if status != 200 {
        return Err(Error::GenerationStatus {
            status,
            body: body.trim().to_string(),
        });
    }
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|_| Error::GenerationResponse(body.trim().to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| Error::GenerationResponse(body.trim().to_string()))
}

#[async_trait]
impl AnswerGenerator for PerplexityClient {
    fn ensure_configured(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let limit = self.config.timeout();
        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "requesting completion"
        );
        match timeout(limit, self.perform_request(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(Error::GenerationTimeout(limit)),
        }
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_success() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Float 5900400 reached 2000 dbar."}}]}"#;
        assert_eq!(
            parse_completion(200, body).unwrap(),
            "Float 5900400 reached 2000 dbar."
        );
    }

    #[test]
    fn test_parse_completion_keeps_content_verbatim() {
        let body = r#"{"choices":[{"message":{"content":"  spaced\nanswer  "}}]}"#;
        assert_eq!(parse_completion(200, body).unwrap(), "  spaced\nanswer  ");
    }

    #[test]
    fn test_parse_completion_error_status() {
        let err = parse_completion(500, r#"{"error":"server"}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains(r#"{"error":"server"}"#));
        assert!(err.is_generation_failure());
    }

    #[test]
    fn test_parse_completion_unexpected_shape() {
        let err = parse_completion(200, r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, Error::GenerationResponse(_)));

        let err = parse_completion(200, "<html>gateway</html>").unwrap_err();
        assert!(matches!(err, Error::GenerationResponse(ref body) if body.contains("gateway")));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "sonar",
            messages: [ChatMessage {
                role: "user",
                content: "Context:\nx\n\nQuestion: y\nAnswer:",
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "model": "sonar",
                "messages": [{"role": "user", "content": "Context:\nx\n\nQuestion: y\nAnswer:"}]
            })
        );
    }

    #[test]
    fn test_ensure_configured() {
        let client = PerplexityClient::new(PerplexityConfig::default()).unwrap();
        let err = client.ensure_configured().unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing(_)));
        assert!(err.to_string().contains("PERPLEXITY_API_KEY"));

        let client = PerplexityClient::new(PerplexityConfig::new("pplx-test")).unwrap();
        assert!(client.ensure_configured().is_ok());
        assert_eq!(client.model_id(), "sonar");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_generation_failure() {
        let config = PerplexityConfig {
            api_url: "http://127.0.0.1:9/chat/completions".to_string(),
            timeout_secs: 2,
            ..PerplexityConfig::new("pplx-test")
        };
        let client = PerplexityClient::new(config).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(err.is_generation_failure());
        assert!(matches!(err, Error::Network(_)));
        assert!(err
            .to_string()
            .starts_with("Network error: Perplexity request failed: "));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept the connection and never answer
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            drop(socket);
        });

        let config = PerplexityConfig {
            api_url: format!("http://{}/chat/completions", addr),
            timeout_secs: 1,
            ..PerplexityConfig::new("pplx-test")
        };
        let client = PerplexityClient::new(config).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        server.abort();

        assert!(matches!(err, Error::GenerationTimeout(d) if d.as_secs() == 1));
        assert_eq!(err.to_string(), "Answer generator request timed out after 1s");
        assert!(err.is_generation_failure());
    }
}
