//! # PromptForge Engine
//!
//! Turns a vague idea into a compiled instruction document.
//!
//! ## Pieces
//!
//! - [`catalog`]: scenario, persona, template and framework text as data
//! - [`fragments`]: citation, output, verbosity, memory and skill blocks
//! - [`assembler`]: layers everything into one instruction text
//! - [`classifier`]: keyword-based scenario guess for an idea
//! - [`dialogue`]: the turn-bounded clarification state machine
//!
//! Nothing here is global. Callers build a catalog, a skill library, an
//! assembler and an engine, and share them through `Arc`.

pub mod assembler;
pub mod catalog;
pub mod classifier;
pub mod dialogue;
pub mod fragments;
pub mod token;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::{AssembledPrompt, AssemblyRequest, LayerStats, PromptAssembler};
pub use catalog::PromptCatalog;
pub use classifier::{Classification, IntentClassifier};
pub use dialogue::{ClarificationEngine, Conversation, ConversationStatus, TurnInput};
pub use fragments::{FragmentConfig, SkillLibrary};
