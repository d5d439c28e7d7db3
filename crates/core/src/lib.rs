//! Core domain types for boardbot:
//! - **Operation results** (`ops`) - the closed set of structured tool outcomes
//! - **Messages** (`message`) - the append-only conversation history entries
//! - **Sessions** (`session`) - expiring store for pending multi-step flows
//! - **Configuration** (`config`) - layered file/env/override config loading
//!
//! # Key Types
//!
//! - `OperationResult` - tagged outcome of every board operation
//! - `Message` - one entry in a turn's history
//! - `SessionStore` - TTL-bounded map of in-flight conversations

pub mod config;
pub mod message;
pub mod ops;
pub mod session;

pub use message::Message;
pub use ops::{BoardRef, CardRef, OperationResult, UpdatedField};
pub use session::{ConversationState, Session, SessionStore};
