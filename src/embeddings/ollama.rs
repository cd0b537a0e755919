//! Embedding provider backed by a local Ollama server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::VaultError;

use super::EmbeddingProvider;

/// Default Ollama endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP embedding provider speaking Ollama's `/api/embed` protocol.
#[derive(Clone, Debug)]
pub struct OllamaEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaEmbeddingProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn embed_url(&self) -> String {
        format!("{}/api/embed", self.endpoint)
    }
}

impl Default for OllamaEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_MODEL)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, VaultError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.embed_url();
        debug!(model = %self.model, inputs = inputs.len(), "requesting embeddings");

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await
            .map_err(|err| {
                VaultError::Embedding(format!("request to {url} failed: {err}"))
            })?
            .error_for_status()
            .map_err(|err| {
                VaultError::Embedding(format!("embedding model unavailable at {url}: {err}"))
            })?;

        let body: EmbedResponse = response.json().await.map_err(|err| {
            VaultError::Embedding(format!("malformed embed response from {url}: {err}"))
        })?;

        Ok(body.embeddings)
    }
}
