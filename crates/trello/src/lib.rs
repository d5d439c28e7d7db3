//! Trello integration - the board-service adapter
//!
//! This crate wraps the Trello REST API behind two layers:
//! - **Client** (`client`) - the `BoardApi` trait and its reqwest-backed
//!   implementation, one method per REST call
//! - **Intents** (`intents`) - name-based operations ("create a card in
//!   To Do") with case-insensitive resolution and suggestion fallback
//!
//! Intent operations return `OperationResult` values; every remote failure
//! is converted at this boundary, nothing propagates as an error past it.

pub mod client;
pub mod intents;

pub use client::{ApiError, BoardApi, CardDetail, ListRef, TrelloClient};
pub use intents::BoardIntents;
