use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("event envelope is not valid JSON: {0}")]
    Malformed(String),
}

/// The raw Events API envelope. Exactly one of `challenge` or `event` is
/// present on the payloads we act on.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub challenge: Option<String>,
    pub event: Option<EventDetails>,
}

#[derive(Debug, Deserialize)]
pub struct EventDetails {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub text: String,
    pub channel: Option<String>,
    pub ts: Option<String>,
    pub thread_ts: Option<String>,
    pub bot_id: Option<String>,
}

/// A user request extracted from an inbound event, ready for the agent.
///
/// `thread_id` is the thread the reply belongs to: the parent's `thread_ts`
/// when the message is already threaded, otherwise the message's own `ts`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnRequest {
    pub text: String,
    pub channel_id: String,
    pub thread_id: String,
}

/// What the webhook should do with one inbound envelope.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// URL verification handshake; echo the token back verbatim.
    Challenge(String),
    /// A user turn to hand to the agent in the background.
    Turn(TurnRequest),
    /// Bot echoes, unsupported event types, unaddressed channel chatter.
    Ignored,
}

const MESSAGE_KEYWORD: &str = "trello:";

/// Classifies one inbound envelope. `has_continuation` reports whether a
/// thread has a saved multi-step session; a thread that does owns its next
/// human message, so the mention and keyword gates are checked only after
/// the continuation lookup misses.
pub fn classify_envelope(
    body: &[u8],
    has_continuation: impl Fn(&str) -> bool,
) -> Result<Inbound, EnvelopeError> {
    let envelope: EventEnvelope = serde_json::from_slice(body)
        .map_err(|error| EnvelopeError::Malformed(error.to_string()))?;

    if let Some(challenge) = envelope.challenge {
        return Ok(Inbound::Challenge(challenge));
    }

    let Some(event) = envelope.event else {
        return Ok(Inbound::Ignored);
    };
    // Never react to our own (or any bot's) messages.
    if event.bot_id.is_some() {
        return Ok(Inbound::Ignored);
    }
    let Some(channel_id) = event.channel.clone() else {
        return Ok(Inbound::Ignored);
    };
    let Some(thread_id) = event.thread_ts.clone().or_else(|| event.ts.clone()) else {
        return Ok(Inbound::Ignored);
    };

    let is_user_message = matches!(event.event_type.as_str(), "app_mention" | "message");
    if is_user_message && has_continuation(&thread_id) {
        let text = match event.event_type.as_str() {
            "app_mention" => strip_leading_mention(&event.text),
            _ => event.text.trim().to_string(),
        };
        if text.is_empty() {
            return Ok(Inbound::Ignored);
        }
        return Ok(Inbound::Turn(TurnRequest { text, channel_id, thread_id }));
    }

    let text = match event.event_type.as_str() {
        "app_mention" => strip_leading_mention(&event.text),
        // Plain channel messages are only ours when addressed by keyword.
        "message" => match strip_keyword(event.text.trim()) {
            Some(request) => request.to_string(),
            None => return Ok(Inbound::Ignored),
        },
        _ => return Ok(Inbound::Ignored),
    };

    if text.is_empty() {
        return Ok(Inbound::Ignored);
    }

    Ok(Inbound::Turn(TurnRequest { text, channel_id, thread_id }))
}

fn strip_keyword(text: &str) -> Option<&str> {
    let prefix = text.get(..MESSAGE_KEYWORD.len())?;
    if !prefix.eq_ignore_ascii_case(MESSAGE_KEYWORD) {
        return None;
    }
    Some(text[MESSAGE_KEYWORD.len()..].trim())
}

/// Drops the leading `<@UBOT>` mention token, keeping the request text.
fn strip_leading_mention(text: &str) -> String {
    match text.split_once('>') {
        Some((_, rest)) => rest.trim().to_string(),
        None => text.trim().to_string(),
    }
}
