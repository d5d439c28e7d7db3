use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ops::OperationResult;

/// One entry in a turn's conversation history.
///
/// History is append-only and never reordered. A `ToolRequest` is always
/// followed by its matching `ToolResult` before the next assistant entry is
/// appended; the reasoning loop enforces this ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User { text: String },
    System { text: String },
    Assistant { text: String },
    ToolRequest { name: String, arguments: Value },
    ToolResult { name: String, payload: OperationResult },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::System { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant { text: text.into() }
    }

    pub fn tool_request(name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolRequest { name: name.into(), arguments }
    }

    pub fn tool_result(name: impl Into<String>, payload: OperationResult) -> Self {
        Self::ToolResult { name: name.into(), payload }
    }

    pub fn is_assistant_text(&self) -> bool {
        matches!(self, Self::Assistant { .. })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Message;
    use crate::ops::OperationResult;

    #[test]
    fn constructors_tag_roles() {
        let request = Message::tool_request("create_card", json!({"list_name": "To Do"}));
        assert!(matches!(request, Message::ToolRequest { ref name, .. } if name == "create_card"));

        let result = Message::tool_result("create_card", OperationResult::error("boom"));
        assert!(matches!(result, Message::ToolResult { .. }));
        assert!(!result.is_assistant_text());
        assert!(Message::assistant("done").is_assistant_text());
    }
}
