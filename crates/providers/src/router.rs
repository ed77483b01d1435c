//! Provider router — selects the chat and embedding backends from config.

use std::collections::HashMap;
use std::sync::Arc;

use promptforge_config::AppConfig;
use promptforge_core::error::ProviderError;
use promptforge_core::provider::{Embedder, Provider};

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes chat requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build chat providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for name in config.providers.keys() {
        router.register(name.clone(), chat_provider(config, name));
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        router.register(
            config.default_provider.clone(),
            chat_provider(config, &config.default_provider),
        );
    }

    router
}

fn chat_provider(config: &AppConfig, name: &str) -> Arc<dyn Provider> {
    let provider_config = config.providers.get(name);
    let api_key = api_key_for(config, name);

    if name == "anthropic" {
        let mut p = AnthropicProvider::new(&api_key);
        if let Some(url) = provider_config.and_then(|p| p.api_url.as_ref()) {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = provider_config
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_base_url(name));
        Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key))
    }
}

/// Build the embedding backend named by `[retrieval].embedding_provider`.
///
/// Only OpenAI-compatible endpoints expose embeddings.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, ProviderError> {
    let name = config.retrieval.embedding_provider.as_str();
    if name == "anthropic" {
        return Err(ProviderError::NotConfigured(
            "Provider 'anthropic' does not support embeddings".into(),
        ));
    }

    let base_url = config
        .providers
        .get(name)
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let embedder = OpenAiCompatProvider::new(name, &base_url, api_key_for(config, name))
        .with_embedding_model(&config.retrieval.embedding_model);
    Ok(Arc::new(embedder))
}

fn api_key_for(config: &AppConfig, name: &str) -> String {
    config
        .providers
        .get(name)
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default()
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "anthropic" => "https://api.anthropic.com/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "qwen" => "https://dashscope.aliyuncs.com/compatible-mode/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptforge_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openai");
        let provider = Arc::new(OpenAiCompatProvider::openai("sk-test"));
        router.register("openai", provider);

        assert!(router.get("openai").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("deepseek").contains("deepseek.com"));
        assert!(default_base_url("qwen").contains("dashscope"));
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert!(router.default().is_some());
        assert_eq!(router.list(), vec!["openai"]);
    }

    #[test]
    fn anthropic_gets_native_provider() {
        let mut config = AppConfig {
            default_provider: "anthropic".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "deepseek".into(),
            ProviderConfig {
                api_key: Some("sk-ds".into()),
                api_url: None,
                default_model: None,
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "anthropic");
        assert_eq!(router.get("deepseek").unwrap().name(), "deepseek");
    }

    #[test]
    fn anthropic_cannot_embed() {
        let mut config = AppConfig::default();
        config.retrieval.embedding_provider = "anthropic".into();
        assert!(build_embedder(&config).is_err());

        config.retrieval.embedding_provider = "openai".into();
        assert_eq!(build_embedder(&config).unwrap().name(), "openai");
    }
}
