//! OpenAI-compatible embedding provider.
//!
//! Posts to `{api_base}/embeddings` with a bearer token and returns the single
//! vector from the response. Any HTTP-level failure surfaces as an
//! [`EmbeddingError`]; nothing is retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

pub struct OpenAiEmbeddingProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: embeddings_endpoint(&config.api_base),
            api_key,
            model: config.model.clone(),
        })
    }
}

fn embeddings_endpoint(api_base: &str) -> String {
    format!("{}/embeddings", api_base.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Pull the first vector (by index) out of a raw response body.
fn parse_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let response: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| EmbeddingError::Decode(e.to_string()))?;
    response
        .data
        .into_iter()
        .min_by_key(|d| d.index)
        .map(|d| d.embedding)
        .ok_or_else(|| EmbeddingError::Decode("response contained no embeddings".into()))
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "embedding provider returned an error");
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let vector = parse_response(&body)?;
        tracing::debug!(model = %self.model, dims = vector.len(), "embedding generated");
        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
