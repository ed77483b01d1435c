//! The clarification dialogue.
//!
//! - [`engine`]: one stateless turn against the chat provider
//! - [`conversation`]: per-session bookkeeping (turn counter, history,
//!   completion, refine policy)
//! - [`reply`]: tagged parsing of the model's structured reply
//! - [`framework`]: final-prompt rendering in the four layouts

pub mod conversation;
pub mod engine;
pub mod framework;
pub mod reply;

pub use conversation::{Conversation, ConversationStatus};
pub use engine::{ClarificationEngine, FORCE_FINAL_DIRECTIVE, TurnInput};
pub use framework::{render_final_prompt, role_name};
pub use reply::{ReplyParse, ReplyPayload, extract_json, fallback_question, parse_reply};
