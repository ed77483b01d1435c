//! Capability traits for the external model backends.
//!
//! A [`Provider`] turns a system instruction plus a message list into reply
//! text. An [`Embedder`] turns texts into vectors. Both are object-safe so the
//! engine holds them as `Arc<dyn ...>` without knowing which backend is behind
//! them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// A single chat call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "gpt-4o", "claude-sonnet-4")
    pub model: String,

    /// The conversation messages (user/assistant only)
    pub messages: Vec<Message>,

    /// System instruction. Transports without a native system field
    /// prepend it as a leading system message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

impl ChatRequest {
    /// A request with default sampling settings.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// The chat capability.
///
/// Every LLM backend implements this trait. The clarification engine calls
/// `chat()` once per turn without knowing which backend is in use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get the complete reply text.
    async fn chat(&self, request: ChatRequest) -> std::result::Result<String, ProviderError>;
}

/// The embedding capability.
///
/// Implementations must preserve order and count: the i-th vector of
/// `embed_batch` belongs to the i-th input text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name for this embedder.
    fn name(&self) -> &str;

    /// Embed a batch of texts.
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;

    /// Embed a single text.
    ///
    /// Default implementation delegates to `embed_batch()`.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("expected 1 embedding, got {}", vectors.len()),
            });
        }
        Ok(vectors.remove(0))
    }
}
