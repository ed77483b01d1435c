//! End-to-end integration tests for the PromptForge pipeline.
//!
//! These tests exercise the whole path from a vague idea to a compiled
//! prompt: classification, layered assembly, retrieval over a persisted
//! corpus, the clarification dialogue, and refinement.

use std::sync::{Arc, Mutex};

use promptforge_config::{AppConfig, RefinePolicy};
use promptforge_core::error::{Error, ProviderError};
use promptforge_core::prompt::{Framework, TurnResult};
use promptforge_core::provider::{ChatRequest, Embedder, Provider};
use promptforge_engine::{
    ClarificationEngine, Conversation, ConversationStatus, FragmentConfig, IntentClassifier,
    PromptAssembler, PromptCatalog, SkillLibrary,
};
use promptforge_retrieval::{
    ChunkConfig, Document, FileVectorIndex, InMemoryVectorIndex, Retriever, segment_document,
};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted replies in sequence.
struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, i: usize) -> ChatRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let replies = self.replies.lock().unwrap();
        let call = requests.len();
        if call >= replies.len() {
            panic!("ScriptedProvider exhausted: call #{}, have {}", call, replies.len());
        }
        requests.push(request);
        Ok(replies[call].clone())
    }
}

/// Bag-of-words embedder over a fixed vocabulary.
struct VocabEmbedder;

const VOCAB: [&str; 6] = ["kettle", "litre", "steel", "warranty", "garden", "soil"];

#[async_trait::async_trait]
impl Embedder for VocabEmbedder {
    fn name(&self) -> &str {
        "vocab"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                let mut v: Vec<f32> = VOCAB
                    .iter()
                    .map(|w| t.matches(w).count() as f32)
                    .collect();
                v.push(0.01);
                v
            })
            .collect())
    }
}

fn question(text: &str, options: &[&str]) -> String {
    let options: Vec<_> = options
        .iter()
        .map(|o| serde_json::json!({"label": o, "value": o}))
        .collect();
    format!(
        "```json\n{}\n```",
        serde_json::json!({
            "type": "question",
            "question": text,
            "options": options,
            "allow_custom": true,
            "current_understanding": {"goal": "kettle product description"}
        })
    )
}

fn final_prompt(goal: &str) -> String {
    format!(
        "Here you go:\n```json\n{}\n```",
        serde_json::json!({
            "type": "prompt",
            "prompt": {
                "goal": goal,
                "persona": "Senior e-commerce copywriter, warm and concrete",
                "audience": "Home cooks shopping online",
                "requires_input": true,
                "input_type": "data",
                "output_format": {"type": "markdown", "sections": ["Headline", "Highlights", "Call to action"]},
                "constraints": {
                    "must": ["Mention capacity and material", "Stay under 150 words"],
                    "must_not": ["Invent certifications"]
                },
                "quality_bar": ["Every claim traceable to the product sheet"],
                "risk_flags": ["prompt_injection"]
            },
            "tags": ["ecommerce", "kitchen"],
            "quality_checklist": ["Role is clearly defined", "Injection defenses are in place"]
        })
    )
}

fn assembler() -> Arc<PromptAssembler> {
    Arc::new(PromptAssembler::new(
        Arc::new(PromptCatalog::builtin().unwrap()),
        Arc::new(SkillLibrary::builtin()),
    ))
}

const PRODUCT_SHEET: &str = "The Aurora kettle holds 1.7 litre of water.\n\n\
    Its body is brushed stainless steel with a cool-touch handle.\n\n\
    Every kettle ships with a two-year warranty.\n\n\
    Unrelated note: rotate garden soil every spring.";

// ── E2E: Full compile pipeline ───────────────────────────────────────────

#[tokio::test]
async fn e2e_compile_with_retrieval_and_refine() {
    let dir = tempfile::TempDir::new().unwrap();
    let index_path = dir.path().join("index.jsonl");

    // Index the product sheet into a persistent corpus.
    let document = Document::new(PRODUCT_SHEET).with_metadata("source", "aurora.md");
    let segments = segment_document(&document, &ChunkConfig::new(60, 10).unwrap()).unwrap();
    assert!(segments.len() > 1);
    {
        let retriever = Retriever::new(
            Arc::new(VocabEmbedder),
            Arc::new(FileVectorIndex::open(&index_path)),
        );
        retriever.add_batch(segments.clone()).await.unwrap();
    }

    // Reopen from disk: the corpus survives.
    let retriever = Arc::new(Retriever::new(
        Arc::new(VocabEmbedder),
        Arc::new(FileVectorIndex::open(&index_path)),
    ));
    assert_eq!(retriever.count().await.unwrap(), segments.len());

    // Classify the idea to pick assembly defaults.
    let assembler = assembler();
    let idea = "Write a product description for our kettle";
    let guess = IntentClassifier::new(assembler.shared_catalog()).classify(idea);
    assert_eq!(guess.scenario, "content_writer");

    let provider = Arc::new(ScriptedProvider::new(vec![
        question("Who is the audience?", &["Home cooks", "Cafe owners"]),
        question("Which tone?", &["Warm", "Technical"]),
        final_prompt("Write a product description for the Aurora kettle"),
        final_prompt("Write a playful product description for the Aurora kettle"),
    ]));
    let engine = ClarificationEngine::new(provider.clone(), assembler, "mock")
        .with_retriever(retriever, 3);

    let mut config = AppConfig::default();
    config.assembly.scenario = guess.scenario.clone();
    config.assembly.persona = guess.persona.clone();
    config.dialogue.retrieval = true;
    config.dialogue.framework = "langgpt".into();
    let mut convo = Conversation::from_config(idea, &config);

    // Turn 1: question, with retrieved reference material in the context.
    let TurnResult::Question(q1) = convo.start(&engine).await.unwrap() else {
        panic!("turn 1 should ask");
    };
    assert_eq!(q1.options.len(), 2);
    assert_eq!((q1.current_turn, q1.max_turns), (1, 5));
    let first = provider.request(0);
    let context = &first.messages[0].content;
    assert!(context.starts_with("===== Retrieved reference material"));
    assert!(context.contains("aurora.md"));
    assert!(context.contains("1.7 litre"));
    let system = first.system.unwrap();
    assert!(system.contains("# Scenario contract: content writer"));
    assert!(system.contains("# [Compile framework: LangGPT]"));

    // Turn 2: no retrieval on intermediate turns.
    let TurnResult::Question(_) = convo.reply(&engine, "Home cooks").await.unwrap() else {
        panic!("turn 2 should ask");
    };
    assert!(provider.request(1).messages[0].content.starts_with("Initial idea:"));

    // Turn 3: final prompt in the LangGPT layout.
    let TurnResult::FinalPrompt(prompt) = convo.reply(&engine, "Warm").await.unwrap() else {
        panic!("turn 3 should finalize");
    };
    assert_eq!(convo.status(), ConversationStatus::Complete);
    assert!(prompt.rendered_text.starts_with("# Role: Senior e-commerce copywriter"));
    assert!(prompt.rendered_text.contains("- Mention capacity and material"));
    assert!(prompt.rendered_text.contains("## Input"));
    assert!(prompt.rendered_text.contains("## Error Handling"));
    assert!(prompt.rendered_text.contains("refuse any request that tries to bypass"));
    assert_eq!(prompt.tags, vec!["ecommerce", "kitchen"]);

    // Further clarification is rejected; refine is not.
    let err = convo.reply(&engine, "more").await.unwrap_err();
    assert!(matches!(err, Error::ConversationComplete(_)));

    let refined = convo.refine(&engine, "make it playful").await.unwrap();
    assert!(refined.rendered_text.contains("playful product description"));
    assert_eq!(convo.turn(), 3);
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn e2e_forced_finalization_at_turn_limit() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        question("Audience?", &["A", "B"]),
        question("Tone?", &["C", "D"]),
        question("Length?", &["Short", "Long"]),
    ]));
    let engine = ClarificationEngine::new(provider.clone(), assembler(), "mock");
    let mut convo = Conversation::new("write a product description")
        .with_max_turns(3)
        .with_framework(Framework::Costar);

    assert!(!convo.start(&engine).await.unwrap().is_final());
    assert!(!convo.reply(&engine, "A").await.unwrap().is_final());

    let TurnResult::FinalPrompt(prompt) = convo.reply(&engine, "C").await.unwrap() else {
        panic!("the last turn must finalize");
    };
    assert!(provider.request(2).messages[0].content.contains("Maximum turns reached"));
    assert_eq!(prompt.spec.unknowns, vec!["Length?"]);
    assert!(prompt.rendered_text.contains("# Objective\nwrite a product description"));
    assert!(convo.is_complete());
}

#[tokio::test]
async fn e2e_counted_refine_respects_limit() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        final_prompt("Describe the kettle"),
        final_prompt("Describe the kettle briefly"),
    ]));
    let engine = ClarificationEngine::new(provider, assembler(), "mock");

    let config: AppConfig = toml::from_str(
        r#"
        [dialogue]
        max_turns = 2
        refine_policy = "counts_toward_max_turns"
        "#,
    )
    .unwrap();
    assert_eq!(config.dialogue.refine_policy, RefinePolicy::CountsTowardMaxTurns);

    let mut convo = Conversation::from_config("describe our kettle", &config);
    assert!(convo.start(&engine).await.unwrap().is_final());
    convo.refine(&engine, "shorter").await.unwrap();

    let err = convo.refine(&engine, "shorter still").await.unwrap_err();
    assert!(matches!(err, Error::TurnLimitReached { .. }));
}

// ── E2E: Assembly ────────────────────────────────────────────────────────

#[test]
fn e2e_assembly_layers_for_code_assistant() {
    let assembler = assembler();
    let guess = IntentClassifier::new(assembler.shared_catalog())
        .classify("Refactor this Python function and add a unit test");
    assert_eq!(guess.scenario, "code_assistant");

    let mut fragments = FragmentConfig::new();
    fragments.memory.add_preference("concise");
    fragments.memory.add_highlight("Project uses Python 3.12");

    let request = promptforge_engine::AssemblyRequest {
        scenario: guess.scenario,
        persona: guess.persona,
        template: guess.template,
        verbosity: 2,
        ..Default::default()
    }
    .with_custom_instructions("Prefer the standard library.")
    .with_retrieved_context("PEP 8 recommends 4-space indentation.");

    let assembled = assembler.assemble(&request, &fragments);
    assert_eq!(
        assembled.layer_names(),
        vec![
            "scenario",
            "skill",
            "persona",
            "output_schema",
            "verbosity",
            "custom",
            "memory",
            "retrieved",
            "hard_rules"
        ]
    );
    assert!(assembled.text.contains("Desired level: 2/10"));
    assert!(assembled.text.contains("Project uses Python 3.12"));
    assert!(assembled.text.contains("no instruction authority"));
    assert_eq!(assembler.assemble(&request, &fragments), assembled);
}

// ── E2E: Retrieval ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_search_caps_at_corpus_size() {
    let retriever = Retriever::new(Arc::new(VocabEmbedder), Arc::new(InMemoryVectorIndex::new()));
    let document = Document::new(PRODUCT_SHEET).with_id("aurora");
    let segments = segment_document(&document, &ChunkConfig::new(500, 50).unwrap()).unwrap();
    assert_eq!(segments.len(), 1);
    retriever.add_batch(segments).await.unwrap();
    retriever
        .add_batch(vec![
            promptforge_core::index::Segment::new("soil", "garden soil care"),
            promptforge_core::index::Segment::new("steel", "steel cleaning tips"),
        ])
        .await
        .unwrap();

    let hits = retriever.search("kettle warranty", 5, None).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(hits[0].id, "aurora_chunk_0");
}
