//! Slack Integration - the chat interface
//!
//! This crate provides the Slack side of boardbot:
//! - **Events** (`events`) - Events API envelope parsing and classification
//! - **Signature** (`signature`) - signed-request verification for the webhook
//! - **Block Kit** (`blocks`) - rich message builders (headers, buttons, cards)
//! - **Notifier** (`notifier`) - `chat.postMessage` delivery with receipts
//! - **Coordinator** (`coordinator`) - the single result-to-message boundary
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Subscribe to `app_mention` and `message.channels` events
//! 3. Point the Events API request URL at `/slack/events`
//! 4. Set env vars: `BOARDBOT_SLACK_BOT_TOKEN`, `BOARDBOT_SLACK_SIGNING_SECRET`

pub mod blocks;
pub mod coordinator;
pub mod events;
pub mod notifier;
pub mod signature;

pub use blocks::{Block, MessageTemplate};
pub use coordinator::ResponseCoordinator;
pub use events::{classify_envelope, EnvelopeError, Inbound, TurnRequest};
pub use notifier::{DeliveryReceipt, HttpNotifier, Notifier, RecordingNotifier};
pub use signature::{verify_signature, SignatureError};
