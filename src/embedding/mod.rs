//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, the availability-gated
//! [`EmbeddingService`] that the engine talks to, and the fixed little-endian
//! blob codec used for storage. The concrete provider is an OpenAI-compatible
//! HTTP endpoint ([`openai::OpenAiEmbeddingProvider`]).

pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

/// Number of dimensions in every stored vector (text-embedding-3-small).
pub const EMBEDDING_DIM: usize = 1536;

/// Size in bytes of a serialized embedding.
pub const EMBEDDING_BYTES: usize = EMBEDDING_DIM * std::mem::size_of::<f32>();

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Identifier of the model producing the vectors.
    fn model(&self) -> &str;
}

/// Gatekeeper in front of the configured provider.
///
/// With no credential the service is disabled: [`is_available`](Self::is_available)
/// reports `false` and [`embed`](Self::embed) fails with
/// [`EmbeddingError::Unavailable`]. Callers check availability before relying
/// on semantic features.
#[derive(Clone)]
pub struct EmbeddingService {
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn disabled() -> Self {
        Self { provider: None }
    }

    /// Build the service from config, reading the credential from the environment.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        match config.provider.as_str() {
            "none" | "disabled" => Ok(Self::disabled()),
            "openai" => match credential_from_env(&config.api_key_env) {
                Some(api_key) => {
                    let provider = openai::OpenAiEmbeddingProvider::new(config, api_key)?;
                    Ok(Self::new(Arc::new(provider)))
                }
                None => {
                    tracing::info!(
                        env = %config.api_key_env,
                        "no embedding credential set, semantic search disabled"
                    );
                    Ok(Self::disabled())
                }
            },
            other => Err(EmbeddingError::Unavailable(format!(
                "unknown embedding provider: {other}. Supported: openai, none"
            ))),
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model())
    }

    /// Embed `text`, rejecting vectors that are not exactly [`EMBEDDING_DIM`] long.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            EmbeddingError::Unavailable("no embedding credential configured".into())
        })?;
        let vector = provider.embed(text).await?;
        if vector.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::Dimensions {
                expected: EMBEDDING_DIM,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

/// Read a non-empty credential from the named environment variable.
pub fn credential_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Serialize an embedding as little-endian f32 bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Deserialize little-endian f32 bytes. A trailing partial value is ignored.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
