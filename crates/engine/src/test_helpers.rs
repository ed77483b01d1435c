//! Shared test helpers for engine tests.

use std::sync::Mutex;

use async_trait::async_trait;
use promptforge_core::error::ProviderError;
use promptforge_core::provider::{ChatRequest, Embedder, Provider};

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `chat` returns the next reply in the queue and records the
/// request. Panics if more calls are made than replies provided.
pub struct SequentialMockProvider {
    replies: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl SequentialMockProvider {
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single(reply: &str) -> Self {
        Self::new(vec![reply])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The sole user message of the most recent request.
    pub fn last_user_message(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let last = requests.last().expect("no requests recorded");
        last.messages.last().expect("empty request").content.clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let call = requests.len();

        if call >= replies.len() {
            panic!(
                "SequentialMockProvider: no more replies (call #{}, have {})",
                call,
                replies.len()
            );
        }

        requests.push(request);
        Ok(replies[call].clone())
    }
}

/// A provider whose backend is always down.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Maps a few known words onto axes so rankings are predictable.
pub struct KeywordEmbedder;

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let t = text.to_lowercase();
    vec![
        if t.contains("kettle") { 1.0 } else { 0.0 },
        if t.contains("python") { 1.0 } else { 0.0 },
        if t.contains("garden") { 1.0 } else { 0.0 },
        0.01,
    ]
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

/// A scripted question reply.
pub fn question_reply(question: &str, options: &[&str]) -> String {
    let options: Vec<serde_json::Value> = options
        .iter()
        .map(|o| serde_json::json!({ "label": o, "value": o.to_lowercase() }))
        .collect();
    format!(
        "```json\n{}\n```",
        serde_json::json!({
            "type": "question",
            "question": question,
            "options": options,
            "allow_custom": true,
            "hint": "Pick one or type your own",
            "current_understanding": "A product description task"
        })
    )
}

/// A scripted final-prompt reply.
pub fn prompt_reply(goal: &str, persona: &str) -> String {
    format!(
        "```json\n{}\n```",
        serde_json::json!({
            "type": "prompt",
            "prompt": {
                "goal": goal,
                "persona": persona,
                "audience": "online shoppers",
                "output_format": {"type": "markdown", "sections": ["Headline", "Body"]},
                "constraints": {"must": ["Stay under 120 words"], "must_not": ["Invent specifications"]}
            },
            "tags": ["ecommerce", "copywriting"],
            "quality_checklist": ["Role is clearly defined"]
        })
    )
}
