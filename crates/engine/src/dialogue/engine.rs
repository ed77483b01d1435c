//! The clarification engine — one turn of the dialogue state machine.
//!
//! # Turn flow
//!
//! 1. Build the context: initial idea, turn counter, full history
//! 2. On turn 1 and on the forced turn, retrieve reference material and
//!    prepend it to the context
//! 3. System text = clarifier prompt + framework addendum + assembled layers
//! 4. One chat call with the context as the sole user message
//! 5. Parse the reply; a forced turn always ends in a final prompt
//!
//! The engine holds no per-conversation state. Everything a turn depends on
//! arrives in [`TurnInput`].

use std::sync::Arc;

use promptforge_core::error::Result;
use promptforge_core::message::{Message, Role};
use promptforge_core::prompt::{FinalPrompt, Framework, PromptSpec, Question, TurnResult};
use promptforge_core::provider::{ChatRequest, Provider};
use promptforge_retrieval::{Retriever, format_context};
use tracing::{debug, info, warn};

use super::framework::{render_final_prompt, render_template};
use super::reply::{ReplyParse, ReplyPayload, parse_reply};
use crate::assembler::{AssemblyRequest, PromptAssembler, reference_block};
use crate::fragments::FragmentConfig;

/// Appended to the context on the last allowed turn.
pub const FORCE_FINAL_DIRECTIVE: &str = "[IMPORTANT] Maximum turns reached; generate the final prompt now from the information available.";

/// Everything one turn depends on.
#[derive(Debug, Clone, Copy)]
pub struct TurnInput<'a> {
    pub initial_idea: &'a str,
    /// Prior messages, oldest first. The latest user answer is last.
    pub history: &'a [Message],
    /// 1-based.
    pub turn: u32,
    pub max_turns: u32,
    pub framework: Framework,
    pub request: &'a AssemblyRequest,
    pub fragments: &'a FragmentConfig,
    /// Whether an attached retriever may be used this conversation.
    pub retrieval: bool,
}

impl TurnInput<'_> {
    /// The last allowed turn must produce a final prompt.
    pub fn is_forced(&self) -> bool {
        self.turn >= self.max_turns
    }

    fn latest_user_message(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Drives clarification turns against a chat provider.
pub struct ClarificationEngine {
    provider: Arc<dyn Provider>,
    assembler: Arc<PromptAssembler>,
    retriever: Option<Arc<Retriever>>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    n_results: usize,
}

impl ClarificationEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        assembler: Arc<PromptAssembler>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            assembler,
            retriever: None,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
            n_results: 5,
        }
    }

    /// Attach a retriever used on the first and the forced turn.
    pub fn with_retriever(mut self, retriever: Arc<Retriever>, n_results: usize) -> Self {
        self.retriever = Some(retriever);
        self.n_results = n_results;
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

    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one clarification turn.
    pub async fn process(&self, input: &TurnInput<'_>) -> Result<TurnResult> {
        let forced = input.is_forced();
        let context = self.turn_context(input).await?;
        let system = self.system_prompt(input);

        let reply = self.chat(system, context).await?;
        let result = self.resolve(parse_reply(&reply), input, forced)?;

        info!(
            turn = input.turn,
            max_turns = input.max_turns,
            forced,
            is_final = result.is_final(),
            "Clarification turn complete"
        );
        Ok(result)
    }

    /// Ask the current question again from a different angle.
    ///
    /// Same context and system text as [`process`](Self::process) plus the
    /// rethink directive. Never retrieves and never forces finalization.
    pub async fn rethink(&self, input: &TurnInput<'_>) -> Result<TurnResult> {
        let catalog = self.assembler.catalog();
        let directive = render_template(
            "rethink",
            &catalog.rethink,
            minijinja::context! { initial_idea => input.initial_idea },
        )?;
        let context = format!("{}\n\n{directive}", base_context(input));
        let system = self.system_prompt(input);

        let reply = self.chat(system, context).await?;
        let result = self.resolve(parse_reply(&reply), input, false)?;
        info!(turn = input.turn, is_final = result.is_final(), "Rethink complete");
        Ok(result)
    }

    /// One-shot revision of a finished prompt.
    ///
    /// A reply that is not a prompt keeps the previous spec and tags, and
    /// its raw text becomes the rendered prompt.
    pub async fn refine(
        &self,
        current: &FinalPrompt,
        instruction: &str,
        framework: Framework,
    ) -> Result<FinalPrompt> {
        let catalog = self.assembler.catalog();
        let request = render_template(
            "refine",
            &catalog.refine,
            minijinja::context! {
                current_prompt => current.rendered_text.as_str(),
                instruction => instruction.trim(),
            },
        )?;

        let reply = self.chat(catalog.hard_rules.trim().to_string(), request).await?;

        match parse_reply(&reply) {
            ReplyParse::Parsed(ReplyPayload::Prompt {
                prompt,
                raw_text,
                tags,
                quality_checklist,
            }) => {
                let rendered_text = self.render(framework, &prompt, raw_text)?;
                info!(framework = %framework, "Prompt refined");
                Ok(FinalPrompt {
                    spec: prompt,
                    rendered_text,
                    tags: if tags.is_empty() { current.tags.clone() } else { tags },
                    quality_checklist: if quality_checklist.is_empty() {
                        current.quality_checklist.clone()
                    } else {
                        quality_checklist
                    },
                })
            }
            _ => {
                warn!(reply_len = reply.len(), "Refine reply is not a prompt, keeping raw text");
                Ok(FinalPrompt {
                    spec: current.spec.clone(),
                    rendered_text: reply.trim().to_string(),
                    tags: current.tags.clone(),
                    quality_checklist: current.quality_checklist.clone(),
                })
            }
        }
    }

    // ── Internals ──────────────────────────────────────────────────────

    async fn turn_context(&self, input: &TurnInput<'_>) -> Result<String> {
        let mut context = base_context(input);
        if input.is_forced() {
            context.push_str("\n\n");
            context.push_str(FORCE_FINAL_DIRECTIVE);
        }

        if let Some(reference) = self.retrieve(input).await? {
            context = format!("{reference}\n\n{context}");
        }
        Ok(context)
    }

    /// Retrieval runs only on turn 1 and on the forced turn.
    async fn retrieve(&self, input: &TurnInput<'_>) -> Result<Option<String>> {
        let Some(retriever) = self.retriever.as_ref().filter(|_| input.retrieval) else {
            return Ok(None);
        };
        if input.turn > 1 && !input.is_forced() {
            return Ok(None);
        }

        let query = match input.latest_user_message() {
            Some(latest) if latest.trim() != input.initial_idea.trim() => {
                format!("{}\n{}", input.initial_idea, latest)
            }
            _ => input.initial_idea.to_string(),
        };

        let hits = retriever.search(&query, self.n_results, None).await?;
        debug!(turn = input.turn, hits = hits.len(), "Retrieved reference material");
        if hits.is_empty() {
            return Ok(None);
        }
        Ok(Some(reference_block(&format_context(&hits))))
    }

    fn system_prompt(&self, input: &TurnInput<'_>) -> String {
        let catalog = self.assembler.catalog();
        let addendum = catalog
            .framework(input.framework)
            .map(|f| f.addendum.trim())
            .unwrap_or_default();
        let assembled = self.assembler.assemble(input.request, input.fragments);

        [catalog.clarifier.trim(), addendum, assembled.text.as_str()]
            .into_iter()
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn chat(&self, system: String, user: String) -> Result<String> {
        let request = ChatRequest::new(self.model.clone(), vec![Message::user(user)])
            .with_system(system)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        debug!(provider = self.provider.name(), model = %self.model, "Calling chat provider");
        Ok(self.provider.chat(request).await?)
    }

    fn resolve(&self, parsed: ReplyParse, input: &TurnInput<'_>, forced: bool) -> Result<TurnResult> {
        match parsed {
            ReplyParse::Parsed(ReplyPayload::Prompt {
                prompt,
                raw_text,
                tags,
                quality_checklist,
            }) => {
                let rendered_text = self.render(input.framework, &prompt, raw_text)?;
                Ok(TurnResult::FinalPrompt(FinalPrompt {
                    spec: prompt,
                    rendered_text,
                    tags,
                    quality_checklist,
                }))
            }
            ReplyParse::Parsed(ReplyPayload::Question {
                question,
                options,
                allow_custom,
                hint,
                current_understanding,
            }) => {
                if forced {
                    warn!(turn = input.turn, "Question on the forced turn, finalizing");
                    let spec = forced_spec(input, current_understanding, Some(question));
                    return self.finalize(input.framework, spec);
                }
                Ok(TurnResult::Question(Question {
                    text: question,
                    options,
                    allow_custom,
                    hint,
                    understanding_snapshot: current_understanding,
                    current_turn: input.turn,
                    max_turns: input.max_turns,
                }))
            }
            ReplyParse::Fallback(mut question) => {
                if forced {
                    warn!(turn = input.turn, "Unreadable reply on the forced turn, finalizing");
                    let spec = forced_spec(input, None, None);
                    return self.finalize(input.framework, spec);
                }
                question.current_turn = input.turn;
                question.max_turns = input.max_turns;
                Ok(TurnResult::Question(question))
            }
        }
    }

    fn finalize(&self, framework: Framework, spec: PromptSpec) -> Result<TurnResult> {
        let rendered_text = render_final_prompt(self.assembler.catalog(), framework, &spec)?;
        Ok(TurnResult::FinalPrompt(FinalPrompt {
            spec,
            rendered_text,
            tags: Vec::new(),
            quality_checklist: Vec::new(),
        }))
    }

    /// Always renders through the framework template. A reply's `raw_text`
    /// fills the context slot when the spec has no context of its own.
    fn render(&self, framework: Framework, spec: &PromptSpec, raw_text: Option<String>) -> Result<String> {
        let catalog = self.assembler.catalog();
        match raw_text.filter(|_| spec.context.is_none()) {
            Some(text) => {
                let spec = PromptSpec {
                    context: Some(text.trim().to_string()),
                    ..spec.clone()
                };
                render_final_prompt(catalog, framework, &spec)
            }
            None => render_final_prompt(catalog, framework, spec),
        }
    }
}

/// Idea, turn counter and labeled history.
fn base_context(input: &TurnInput<'_>) -> String {
    let history = if input.history.is_empty() {
        "(none yet)".to_string()
    } else {
        input
            .history
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Initial idea: {}\nCurrent turn: {}/{}\n\nConversation history:\n{}",
        input.initial_idea, input.turn, input.max_turns, history
    )
}

/// What is known when the model keeps asking on the forced turn.
fn forced_spec(
    input: &TurnInput<'_>,
    understanding: Option<String>,
    open_question: Option<String>,
) -> PromptSpec {
    PromptSpec {
        goal: Some(input.initial_idea.trim().to_string()).filter(|g| !g.is_empty()),
        context: understanding,
        unknowns: open_question.into_iter().collect(),
        ..PromptSpec::default()
    }
}
