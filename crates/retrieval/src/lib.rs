//! Retrieval for PromptForge.
//!
//! Long documents are split into overlapping segments, embedded, and stored
//! in a vector index; queries are embedded and ranked by cosine similarity.
//!
//! Backends:
//! - **InMemoryVectorIndex** — ephemeral, for tests and single sessions
//! - **FileVectorIndex** — JSONL file, for the CLI's persistent corpus

pub mod chunker;
pub mod corpus;
pub mod file_index;
pub mod in_memory;
pub mod retriever;
pub mod vector;

pub use chunker::{ChunkConfig, chunk_text};
pub use corpus::{Document, generate_doc_id, segment_document};
pub use file_index::FileVectorIndex;
pub use in_memory::InMemoryVectorIndex;
pub use retriever::{RetrievedSegment, Retriever, RetrieverStats, format_context};
