//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System instruction as a top-level field

use async_trait::async_trait;
use promptforge_core::error::ProviderError;
use promptforge_core::message::{Message, Role};
use promptforge_core::provider::{ChatRequest, Provider};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_default();

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url
            .into()
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();
        self
    }

    /// Split out stray system messages and merge them into the system field.
    fn extract_system(system: Option<&str>, messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_parts: Vec<&str> = system.filter(|s| !s.is_empty()).into_iter().collect();
        let mut api_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::User => api_messages.push(AnthropicMessage {
                    role: "user".into(),
                    content: msg.content.clone(),
                }),
                Role::Assistant => api_messages.push(AnthropicMessage {
                    role: "assistant".into(),
                    content: msg.content.clone(),
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, api_messages)
    }

    fn response_text(resp: AnthropicResponse) -> String {
        resp.content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: ChatRequest) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let (system, api_messages) =
            Self::extract_system(request.system.as_deref(), &request.messages);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": api_messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        if let Some(ref sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        debug!(provider = "anthropic", model = %request.model, "Sending chat request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
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
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::ApiError {
                    status_code: 200,
                    message: format!("Failed to parse Anthropic response: {e}"),
                })?;

        Ok(Self::response_text(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider =
            AnthropicProvider::new("sk-ant-test").with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");

        let provider = AnthropicProvider::new("k").with_base_url("https://api.anthropic.com/v1");
        assert_eq!(provider.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn system_goes_to_top_level() {
        let messages = vec![
            Message::system("Be concise"),
            Message::user("Hello"),
            Message::assistant("Hi!"),
        ];
        let (system, api) = AnthropicProvider::extract_system(Some("You compile prompts"), &messages);
        assert_eq!(system.as_deref(), Some("You compile prompts\n\nBe concise"));
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "user");
        assert_eq!(api[1].role, "assistant");
    }

    #[test]
    fn no_system_at_all() {
        let (system, api) = AnthropicProvider::extract_system(None, &[Message::user("x")]);
        assert!(system.is_none());
        assert_eq!(api.len(), 1);
    }

    #[test]
    fn response_text_skips_non_text_blocks() {
        let data = r#"{"id":"m1","model":"claude","content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"{\"type\":\"question\"}"}],"usage":{"input_tokens":1,"output_tokens":2}}"#;
        let resp: AnthropicResponse = serde_json::from_str(data).unwrap();
        assert_eq!(AnthropicProvider::response_text(resp), "{\"type\":\"question\"}");
    }
}
