//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, DeepSeek, Qwen (DashScope compatible mode), Ollama,
//! vLLM, and any endpoint exposing `/chat/completions` and `/embeddings`.
//!
//! The chat API has no top-level system field, so the system instruction is
//! sent as a leading `system` message.

use async_trait::async_trait;
use promptforge_core::error::ProviderError;
use promptforge_core::message::{Message, Role};
use promptforge_core::provider::{ChatRequest, Embedder, Provider};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// An OpenAI-compatible chat and embedding provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    embedding_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create a DeepSeek provider (convenience constructor).
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new("deepseek", "https://api.deepseek.com/v1", api_key)
    }

    /// Create a Qwen provider via DashScope's compatible mode.
    pub fn qwen(api_key: impl Into<String>) -> Self {
        Self::new(
            "qwen",
            "https://dashscope.aliyuncs.com/compatible-mode/v1",
            api_key,
        )
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Use a specific model for `/embeddings`.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Build the wire message list, system instruction first.
    fn to_api_messages(system: Option<&str>, messages: &[Message]) -> Vec<ApiMessage> {
        let system = system
            .filter(|s| !s.is_empty())
            .map(|s| ApiMessage {
                role: "system".into(),
                content: s.to_string(),
            });

        system
            .into_iter()
            .chain(messages.iter().map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: m.content.clone(),
            }))
            .collect()
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: ChatRequest) -> std::result::Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(request.system.as_deref(), &request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        debug!(provider = %self.name, model = %request.model, "Sending chat request");

        let response = self.post("chat/completions", &body).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": texts,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %self.embedding_model,
            count = texts.len(),
            "Sending embedding request"
        );

        let response = self.post("embeddings", &body).await?;

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        Ok(ordered_embeddings(api_resp.data))
    }
}

/// The API tags each vector with its input index; restore input order.
fn ordered_embeddings(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ApiReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        assert_eq!(Provider::name(&provider), "openai");
        assert!(provider.base_url.contains("api.openai.com"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(Provider::name(&provider), "ollama");
        assert!(provider.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("x", "http://host/v1/", "k");
        assert_eq!(provider.base_url, "http://host/v1");
    }

    #[test]
    fn system_is_prepended() {
        let messages = vec![Message::user("Hello"), Message::assistant("Hi")];
        let api = OpenAiCompatProvider::to_api_messages(Some("be brief"), &messages);
        assert_eq!(api.len(), 3);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[0].content, "be brief");
        assert_eq!(api[1].role, "user");
        assert_eq!(api[2].role, "assistant");
    }

    #[test]
    fn empty_system_is_skipped() {
        let api = OpenAiCompatProvider::to_api_messages(Some(""), &[Message::user("x")]);
        assert_eq!(api.len(), 1);
        let api = OpenAiCompatProvider::to_api_messages(None, &[Message::user("x")]);
        assert_eq!(api.len(), 1);
    }

    #[test]
    fn parse_chat_response() {
        let data = r#"{"id":"c1","model":"gpt-4o","choices":[{"index":0,"message":{"role":"assistant","content":"{\"type\":\"question\"}"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"type\":\"question\"}")
        );
    }

    #[test]
    fn embeddings_restored_to_input_order() {
        let data = r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}],"model":"m"}"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        let vectors = ordered_embeddings(parsed.data);
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
