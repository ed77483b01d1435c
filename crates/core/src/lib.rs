//! # PromptForge Core
//!
//! Domain types, capability traits, and error definitions for the PromptForge
//! prompt compiler. This crate has **zero framework dependencies**: it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability (chat, embedding, vector index) is a trait here.
//! Implementations live in their respective crates, and tests swap in
//! scripted stand-ins.

pub mod error;
pub mod index;
pub mod message;
pub mod prompt;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IndexError, ProviderError, Result};
pub use index::{IndexHit, IndexRecord, MetadataFilter, Segment, VectorIndex};
pub use message::{ConversationId, Message, Role};
pub use prompt::{
    Constraints, FinalPrompt, Framework, InputType, OutputFormatSpec, PromptSpec, Question,
    QuestionOption, ToolPolicy, TurnResult, UNKNOWN,
};
pub use provider::{ChatRequest, Embedder, Provider};
