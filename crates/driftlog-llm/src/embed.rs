//! Embedding clients.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use driftlog_core::{DriftlogError, Embedder, EmbeddingConfig, Result};

use crate::http::{build_client, check_status, join_url};

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    dimension: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new embedder from configuration and an API key.
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(DriftlogError::config("embedding.batch_size must be positive"));
        }

        info!(
            "Embedder initialized: model={}, dim={}",
            config.model, config.dimension
        );

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
            dimension: config.dimension,
            batch_size: config.batch_size,
        })
    }

    /// Embed one request-sized batch.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding batch: size={}", texts.len());

        let response = self
            .client
            .post(join_url(&self.endpoint, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| DriftlogError::embedding(format!("Request failed: {}", e)))?;

        let response = check_status(response, "Embeddings API").await?;
        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DriftlogError::embedding(format!("Invalid response: {}", e)))?;

        order_embeddings(body, texts.len())
    }
}

/// Put response vectors back into request order and check the count.
fn order_embeddings(mut body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if body.data.len() != expected {
        return Err(DriftlogError::embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            body.data.len()
        )));
    }

    body.data.sort_by_key(|d| d.index);
    Ok(body.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        Ok(results.into_iter().next().unwrap_or_default())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// A mock embedder for testing that doesn't require a provider.
///
/// Uses feature hashing over lowercase word tokens, so texts sharing words
/// land close together and identical texts embed identically.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Create a new mock embedder with default settings.
    pub fn new() -> Self {
        Self { dimension: 256 }
    }

    /// Create a mock embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let hash = token
                .bytes()
                .fold(0xcbf29ce484222325u64, |acc, b| {
                    (acc ^ b as u64).wrapping_mul(0x100000001b3)
                });
            embedding[(hash % self.dimension as u64) as usize] += 1.0;
        }

        // L2 normalize
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
