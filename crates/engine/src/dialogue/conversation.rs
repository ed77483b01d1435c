//! Conversation bookkeeping around the stateless clarification engine.
//!
//! A [`Conversation`] owns everything that persists between turns: the turn
//! counter, the history, its own fragment state, and the final prompt once
//! one exists. State is committed only after a turn succeeds, so a failed
//! chat or embedding call leaves the conversation exactly as it was.

use chrono::{DateTime, Utc};
use promptforge_config::{AppConfig, RefinePolicy};
use promptforge_core::error::{Error, Result};
use promptforge_core::message::{ConversationId, Message};
use promptforge_core::prompt::{FinalPrompt, Framework, Question, TurnResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::engine::{ClarificationEngine, TurnInput};
use crate::assembler::AssemblyRequest;
use crate::fragments::FragmentConfig;

/// Where a conversation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Clarifying,
    Complete,
}

/// One clarification session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    initial_idea: String,
    /// Turn most recently processed; 0 before `start`.
    turn: u32,
    max_turns: u32,
    framework: Framework,
    history: Vec<Message>,
    status: ConversationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_question: Option<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_prompt: Option<FinalPrompt>,
    options: AssemblyRequest,
    #[serde(default)]
    fragments: FragmentConfig,
    #[serde(default)]
    refine_policy: RefinePolicy,
    #[serde(default)]
    retrieval: bool,
    created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(initial_idea: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            initial_idea: initial_idea.into().trim().to_string(),
            turn: 0,
            max_turns: 5,
            framework: Framework::Standard,
            history: Vec::new(),
            status: ConversationStatus::Clarifying,
            last_question: None,
            final_prompt: None,
            options: AssemblyRequest::default(),
            fragments: FragmentConfig::new(),
            refine_policy: RefinePolicy::default(),
            retrieval: true,
            created_at: Utc::now(),
        }
    }

    /// A conversation using the dialogue and assembly settings from config.
    pub fn from_config(initial_idea: impl Into<String>, config: &AppConfig) -> Self {
        Self::new(initial_idea)
            .with_max_turns(config.dialogue.max_turns)
            .with_framework(Framework::from_id(&config.dialogue.framework))
            .with_refine_policy(config.dialogue.refine_policy)
            .with_retrieval(config.dialogue.retrieval)
            .with_options(AssemblyRequest::from_config(&config.assembly))
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = framework;
        self
    }

    pub fn with_options(mut self, options: AssemblyRequest) -> Self {
        self.options = options;
        self
    }

    pub fn with_fragments(mut self, fragments: FragmentConfig) -> Self {
        self.fragments = fragments;
        self
    }

    pub fn with_refine_policy(mut self, policy: RefinePolicy) -> Self {
        self.refine_policy = policy;
        self
    }

    pub fn with_retrieval(mut self, retrieval: bool) -> Self {
        self.retrieval = retrieval;
        self
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn initial_idea(&self) -> &str {
        &self.initial_idea
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn framework(&self) -> Framework {
        self.framework
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == ConversationStatus::Complete
    }

    pub fn is_started(&self) -> bool {
        self.turn > 0
    }

    pub fn last_question(&self) -> Option<&Question> {
        self.last_question.as_ref()
    }

    pub fn final_prompt(&self) -> Option<&FinalPrompt> {
        self.final_prompt.as_ref()
    }

    pub fn options(&self) -> &AssemblyRequest {
        &self.options
    }

    pub fn fragments(&self) -> &FragmentConfig {
        &self.fragments
    }

    /// Fragment state is changed only through its own setters.
    pub fn fragments_mut(&mut self) -> &mut FragmentConfig {
        &mut self.fragments
    }

    pub fn refine_policy(&self) -> RefinePolicy {
        self.refine_policy
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // ── Operations ─────────────────────────────────────────────────────

    /// Run turn 1 with the initial idea as the first user message.
    pub async fn start(&mut self, engine: &ClarificationEngine) -> Result<TurnResult> {
        if self.is_complete() {
            return Err(Error::ConversationComplete(self.id.to_string()));
        }
        if self.is_started() {
            return Err(Error::Internal(format!(
                "Conversation {} has already started",
                self.id
            )));
        }

        let mut history = self.history.clone();
        history.push(Message::user(self.initial_idea.clone()));
        let result = engine.process(&self.turn_input(&history, 1)).await?;

        self.commit(history, 1, &result);
        Ok(result)
    }

    /// Answer the pending question and run the next turn.
    pub async fn reply(&mut self, engine: &ClarificationEngine, answer: &str) -> Result<TurnResult> {
        if self.is_complete() {
            return Err(Error::ConversationComplete(self.id.to_string()));
        }
        if !self.is_started() {
            return self.start(engine).await;
        }

        let turn = self.turn + 1;
        let mut history = self.history.clone();
        history.push(Message::user(answer.trim()));
        let result = engine.process(&self.turn_input(&history, turn)).await?;

        self.commit(history, turn, &result);
        Ok(result)
    }

    /// Ask the pending question again from a different angle. The turn
    /// counter does not move.
    pub async fn rethink(&mut self, engine: &ClarificationEngine) -> Result<TurnResult> {
        if self.is_complete() {
            return Err(Error::ConversationComplete(self.id.to_string()));
        }
        if !self.is_started() {
            return self.start(engine).await;
        }

        let history = self.history.clone();
        let result = engine.rethink(&self.turn_input(&history, self.turn)).await?;

        self.commit(history, self.turn, &result);
        Ok(result)
    }

    /// Revise the final prompt with a free-form instruction.
    ///
    /// Under [`RefinePolicy::CountsTowardMaxTurns`] each refinement consumes
    /// a turn and is rejected once the limit is reached.
    pub async fn refine(
        &mut self,
        engine: &ClarificationEngine,
        instruction: &str,
    ) -> Result<FinalPrompt> {
        let Some(current) = self.final_prompt.as_ref() else {
            return Err(Error::NothingToRefine(self.id.to_string()));
        };

        let counts = self.refine_policy == RefinePolicy::CountsTowardMaxTurns;
        if counts && self.turn >= self.max_turns {
            return Err(Error::TurnLimitReached {
                id: self.id.to_string(),
                max_turns: self.max_turns,
            });
        }

        let refined = engine.refine(current, instruction, self.framework).await?;

        self.history.push(Message::user(instruction.trim()));
        self.history.push(Message::assistant(refined.rendered_text.clone()));
        if counts {
            self.turn += 1;
        }
        self.final_prompt = Some(refined.clone());
        info!(conversation = %self.id, turn = self.turn, "Final prompt refined");
        Ok(refined)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn turn_input<'a>(&'a self, history: &'a [Message], turn: u32) -> TurnInput<'a> {
        TurnInput {
            initial_idea: &self.initial_idea,
            history,
            turn,
            max_turns: self.max_turns,
            framework: self.framework,
            request: &self.options,
            fragments: &self.fragments,
            retrieval: self.retrieval,
        }
    }

    fn commit(&mut self, mut history: Vec<Message>, turn: u32, result: &TurnResult) {
        match result {
            TurnResult::Question(question) => {
                history.push(Message::assistant(question_transcript(question)));
                self.last_question = Some(question.clone());
            }
            TurnResult::FinalPrompt(prompt) => {
                history.push(Message::assistant(prompt.rendered_text.clone()));
                self.last_question = None;
                self.final_prompt = Some(prompt.clone());
                self.status = ConversationStatus::Complete;
                info!(conversation = %self.id, turn, "Conversation complete");
            }
        }
        self.history = history;
        self.turn = turn;
    }
}

/// How an asked question is recorded in the history.
fn question_transcript(question: &Question) -> String {
    if question.options.is_empty() {
        return question.text.clone();
    }
    let labels: Vec<&str> = question.options.iter().map(|o| o.label.as_str()).collect();
    format!("{}\nOptions: {}", question.text, labels.join(" / "))
}
