//! Error types for the PromptForge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external capability has its own error variant so callers can tell
//! a failed chat call apart from a failed embedding or index call.

use thiserror::Error;

/// The top-level error type for all PromptForge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Capability errors ---
    #[error("Chat capability unavailable: {0}")]
    ChatUnavailable(#[from] ProviderError),

    #[error("Embedding capability unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector index error: {0}")]
    Index(#[from] IndexError),

    // --- Input validation ---
    #[error("Invalid chunking config: overlap {overlap} must be smaller than chunk_size {chunk_size}")]
    InvalidChunkingConfig { chunk_size: usize, overlap: usize },

    // --- Conversation bookkeeping ---
    #[error("Conversation {0} is already complete")]
    ConversationComplete(String),

    #[error("Conversation {0} has no final prompt to refine")]
    NothingToRefine(String),

    #[error("Conversation {id} reached its turn limit of {max_turns}")]
    TurnLimitReached { id: String, max_turns: u32 },

    // --- Rendering ---
    #[error("Template error: {0}")]
    Template(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
