//! Chat and embedding provider implementations for PromptForge.
//!
//! All chat backends implement `promptforge_core::Provider`; embedding
//! backends implement `promptforge_core::Embedder`. The router selects the
//! correct backend based on configuration.

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_embedder, build_from_config};
