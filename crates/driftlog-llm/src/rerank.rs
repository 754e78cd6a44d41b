//! Relevance scoring via a Cohere-compatible rerank endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use driftlog_core::{DriftlogError, RelevanceScore, RelevanceScorer, RerankConfig, Result};

use crate::http::{build_client, check_status, join_url};

pub struct CohereReranker {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [&'a str],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f64,
}

impl CohereReranker {
    pub fn new(config: &RerankConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl RelevanceScorer for CohereReranker {
    async fn score(
        &self,
        query: &str,
        documents: &[&str],
        top_n: usize,
    ) -> Result<Vec<RelevanceScore>> {
        debug!("Reranking {} documents, top_n={}", documents.len(), top_n);

        let response = self
            .client
            .post(join_url(&self.endpoint, "v2/rerank"))
            .bearer_auth(&self.api_key)
            .json(&RerankRequest {
                model: &self.model,
                query,
                documents,
                top_n,
            })
            .send()
            .await
            .map_err(|e| DriftlogError::rerank(format!("Request failed: {}", e)))?;

        let response = check_status(response, "Rerank API").await?;
        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| DriftlogError::rerank(format!("Invalid response: {}", e)))?;

        Ok(into_scores(body))
    }
}

fn into_scores(body: RerankResponse) -> Vec<RelevanceScore> {
    body.results
        .into_iter()
        .map(|r| RelevanceScore {
            index: r.index,
            relevance_score: r.relevance_score,
        })
        .collect()
}
