//! Answer generation via the Anthropic Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use driftlog_core::{
    DriftlogError, GenerationConfig, GenerationRequest, Generator, Result,
};

use crate::http::{build_client, check_status, join_url};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicGenerator {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            "Generating with model={}, max_tokens={}",
            self.model, request.max_tokens
        );

        let response = self
            .client
            .post(join_url(&self.endpoint, "v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                system: &request.system,
                messages: [Message {
                    role: "user",
                    content: &request.user,
                }],
            })
            .send()
            .await
            .map_err(|e| DriftlogError::generation(format!("Request failed: {}", e)))?;

        let response = check_status(response, "Messages API").await?;
        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| DriftlogError::generation(format!("Invalid response: {}", e)))?;

        Ok(collect_text(body))
    }
}

/// Concatenate the text blocks of a response.
fn collect_text(body: MessagesResponse) -> String {
    body.content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect()
}
