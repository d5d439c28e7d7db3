use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

use boardbot_core::config::LlmConfig;
use boardbot_core::message::Message;

use crate::tools::ToolSpec;

#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error("model client could not be constructed: {0}")]
    Build(#[source] reqwest::Error),
    #[error("model request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("model returned HTTP {status}")]
    Status { status: u16 },
    #[error("model reply was malformed: {0}")]
    Malformed(String),
}

/// What the model decided: answer the user, or call a tool first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReasonerReply {
    Text(String),
    ToolRequest { name: String, arguments: Value },
}

/// One model invocation over the turn's full history.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn invoke(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<ReasonerReply, ReasonerError>;
}

/// OpenAI-compatible chat-completions client. Works against any endpoint
/// speaking that dialect, including a local Ollama server.
pub struct ChatCompletionsReasoner {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    tools: Vec<Value>,
}

impl ChatCompletionsReasoner {
    pub fn new(config: &LlmConfig, tool_specs: &[ToolSpec]) -> Result<Self, ReasonerError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ReasonerError::Build)?;

        let tools = tool_specs
            .iter()
            .map(|spec| {
                json!({
                    "type": "function",
                    "function": {
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": spec.parameters,
                    },
                })
            })
            .collect();

        let base_url =
            config.base_url.as_deref().unwrap_or_else(|| config.provider.default_base_url());

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            tools,
        })
    }

    fn wire_messages(system_prompt: &str, history: &[Message]) -> Vec<Value> {
        let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
        let mut last_call_id = String::new();

        for (index, message) in history.iter().enumerate() {
            match message {
                Message::User { text } => {
                    messages.push(json!({ "role": "user", "content": text }));
                }
                Message::System { text } => {
                    messages.push(json!({ "role": "system", "content": text }));
                }
                Message::Assistant { text } => {
                    messages.push(json!({ "role": "assistant", "content": text }));
                }
                Message::ToolRequest { name, arguments } => {
                    last_call_id = format!("call_{index}");
                    messages.push(json!({
                        "role": "assistant",
                        "content": Value::Null,
                        "tool_calls": [{
                            "id": last_call_id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": arguments.to_string(),
                            },
                        }],
                    }));
                }
                Message::ToolResult { name, payload } => {
                    let content = serde_json::to_string(payload)
                        .unwrap_or_else(|_| r#"{"kind":"error"}"#.to_string());
                    messages.push(json!({
                        "role": "tool",
                        "tool_call_id": last_call_id,
                        "name": name,
                        "content": content,
                    }));
                }
            }
        }

        messages
    }

    fn decode_reply(body: &Value) -> Result<ReasonerReply, ReasonerError> {
        let message = body
            .pointer("/choices/0/message")
            .ok_or_else(|| ReasonerError::Malformed("no choices in response".to_string()))?;

        if let Some(call) = message.pointer("/tool_calls/0/function") {
            let name = call
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ReasonerError::Malformed("tool call without a name".to_string()))?
                .to_string();
            let raw_arguments = call.get("arguments").and_then(Value::as_str).unwrap_or("{}");
            let arguments: Value = serde_json::from_str(raw_arguments).map_err(|error| {
                ReasonerError::Malformed(format!("tool arguments are not JSON: {error}"))
            })?;
            return Ok(ReasonerReply::ToolRequest { name, arguments });
        }

        let text = message
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| ReasonerError::Malformed("assistant message has no content".to_string()))?
            .to_string();
        Ok(ReasonerReply::Text(text))
    }
}

#[async_trait]
impl Reasoner for ChatCompletionsReasoner {
    async fn invoke(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<ReasonerReply, ReasonerError> {
        let mut body = json!({
            "model": self.model,
            "messages": Self::wire_messages(system_prompt, history),
            "temperature": 0.1,
        });
        if !self.tools.is_empty() {
            body["tools"] = Value::Array(self.tools.clone());
        }

        let mut request = self.http.post(format!("{}/chat/completions", self.base_url));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.json(&body).send().await.map_err(ReasonerError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReasonerError::Status { status: status.as_u16() });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| ReasonerError::Malformed(error.to_string()))?;
        Self::decode_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use boardbot_core::message::Message;
    use boardbot_core::ops::OperationResult;

    use super::{ChatCompletionsReasoner, ReasonerReply};

    #[test]
    fn history_maps_to_chat_completions_roles() {
        let history = vec![
            Message::user("create a card"),
            Message::tool_request("create_new_card", json!({"card_name": "Buy milk"})),
            Message::tool_result(
                "create_new_card",
                OperationResult::CardCreated {
                    card_name: "Buy milk".to_string(),
                    list_name: "To Do".to_string(),
                },
            ),
        ];

        let messages = ChatCompletionsReasoner::wire_messages("be helpful", &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "create_new_card");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], messages[2]["tool_calls"][0]["id"]);
    }

    #[test]
    fn decodes_tool_calls_ahead_of_text() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_0",
                        "type": "function",
                        "function": {
                            "name": "list_boards",
                            "arguments": "{}",
                        },
                    }],
                },
            }],
        });

        let reply = ChatCompletionsReasoner::decode_reply(&body).expect("decode");
        assert_eq!(
            reply,
            ReasonerReply::ToolRequest { name: "list_boards".to_string(), arguments: json!({}) }
        );
    }

    #[test]
    fn decodes_plain_assistant_text() {
        let body = json!({
            "choices": [{ "message": { "content": "Hello! How can I help?" } }],
        });
        let reply = ChatCompletionsReasoner::decode_reply(&body).expect("decode");
        assert_eq!(reply, ReasonerReply::Text("Hello! How can I help?".to_string()));
    }

    #[test]
    fn malformed_replies_are_errors_not_panics() {
        assert!(ChatCompletionsReasoner::decode_reply(&json!({})).is_err());
        let garbage_args = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": { "name": "list_boards", "arguments": "not json" },
                    }],
                },
            }],
        });
        assert!(ChatCompletionsReasoner::decode_reply(&garbage_args).is_err());
    }
}
