//! HTTP providers for an OpenAI-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use scout_core::{Embedder, LanguageModel, ProviderConfig, Result, ScoutError};

// Wire shapes

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

fn build_client(config: &ProviderConfig, provider: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ScoutError::provider(provider, format!("Failed to build client: {}", e)))
}

fn api_key(config: &ProviderConfig) -> Option<String> {
    std::env::var(&config.api_key_env).ok()
}

fn request_error(provider: &str, e: reqwest::Error) -> ScoutError {
    if e.is_timeout() || e.is_connect() {
        ScoutError::provider_transient(provider, e.to_string())
    } else {
        ScoutError::provider(provider, e.to_string())
    }
}

/// Embedding provider over an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpEmbedder {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = build_client(&config, "embedding")?;
        Ok(Self { client, config })
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts", texts.len());

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .json(&EmbeddingsRequest {
                model: &self.config.embedding_model,
                input: texts.to_vec(),
            });
        if let Some(key) = api_key(&self.config) {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error("embedding", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::provider(
                "embedding",
                format!("HTTP {}: {}", status, body),
            ));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::provider("embedding", format!("Bad response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(ScoutError::provider(
                "embedding",
                format!("Expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            ));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::provider("embedding", "No embedding returned"))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

/// Completion provider over an OpenAI-compatible `/chat/completions`
/// endpoint. Low temperature; SQL generation wants stable answers.
pub struct HttpLanguageModel {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpLanguageModel {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = build_client(&config, "language-model")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(&ChatRequest {
                model: &self.config.completion_model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.1,
            });
        if let Some(key) = api_key(&self.config) {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error("language-model", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::provider(
                "language-model",
                format!("HTTP {}: {}", status, body),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::provider("language-model", format!("Bad response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ScoutError::provider("language-model", "No completion returned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = EmbeddingsRequest {
            model: "text-embedding-3-small",
            input: vec!["hello", "world"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "SELECT 1"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "SELECT 1");
    }
}
