//! Agent Runtime - the reasoning loop
//!
//! This crate turns one inbound chat request into exactly one response:
//! - **Reasoner** (`reasoner`) - the model boundary, with an
//!   OpenAI-compatible chat-completions implementation
//! - **Tools** (`tools`) - the closed dispatch table of board operations,
//!   built once at startup
//! - **Runtime** (`runtime`) - the explicit turn state machine:
//!   `Start → CheckContinuation → Reasoning → {ToolDispatch →
//!   ExtractResults → Reasoning}* → Respond → End`, bounded by `max_cycles`
//!
//! All Reasoner and board failures become `OperationResult::Error` values
//! inside the loop; nothing propagates past `ToolDispatch`, and the turn
//! always ends with a single user-visible message.

pub mod reasoner;
pub mod runtime;
pub mod tools;

pub use reasoner::{ChatCompletionsReasoner, Reasoner, ReasonerError, ReasonerReply};
pub use runtime::{AgentRuntime, SYSTEM_PROMPT};
pub use tools::{board_tools, CallContext, ToolHandler, ToolRegistry, ToolReply, ToolSpec};
