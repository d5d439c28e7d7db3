use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use boardbot_core::ops::OperationResult;
use boardbot_core::session::{ConversationState, SessionStore};
use boardbot_trello::BoardIntents;

/// Where the tool call came from, for tools that touch conversation state.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub thread_id: String,
    pub channel_id: String,
}

/// A tool either produced a board operation result or needs to ask the user
/// something before any operation can run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolReply {
    Operation(OperationResult),
    Clarify { question: String },
}

/// Name, description, and JSON-schema parameters advertised to the model.
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn call(&self, arguments: &Value, ctx: &CallContext) -> ToolReply;
}

/// Closed dispatch table, built once at startup. Lookup misses are the
/// caller's problem to convert into an error result.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn register<H>(&mut self, handler: H)
    where
        H: ToolHandler + 'static,
    {
        self.handlers.insert(handler.spec().name, Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> =
            self.handlers.values().map(|handler| handler.spec()).collect();
        specs.sort_by_key(|spec| spec.name);
        specs
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// The full board tool set wired to live collaborators.
pub fn board_tools(intents: Arc<BoardIntents>, sessions: Arc<SessionStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(ListBoardsTool { intents: intents.clone() });
    registry.register(ListCardsTool { intents: intents.clone() });
    registry.register(CreateCardTool { intents: intents.clone() });
    registry.register(MoveCardTool { intents: intents.clone() });
    registry.register(UpdateCardTool { intents: intents.clone() });
    registry.register(DailyReportTool { intents });
    registry.register(AskCardNameTool { sessions });
    registry
}

fn required_str<'a>(arguments: &'a Value, key: &str, tool: &str) -> Result<&'a str, ToolReply> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ToolReply::Operation(OperationResult::error(format!(
                "Missing required argument '{key}' for {tool}."
            )))
        })
}

fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

struct ListBoardsTool {
    intents: Arc<BoardIntents>,
}

#[async_trait]
impl ToolHandler for ListBoardsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "list_boards",
            description: "Shows all Trello boards the bot can see.",
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        }
    }

    async fn call(&self, _arguments: &Value, _ctx: &CallContext) -> ToolReply {
        ToolReply::Operation(self.intents.list_boards().await)
    }
}

struct ListCardsTool {
    intents: Arc<BoardIntents>,
}

#[async_trait]
impl ToolHandler for ListCardsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "list_cards_in_list",
            description: "Shows the cards in a named list on the board.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "list_name": { "type": "string", "description": "Name of the list." },
                },
                "required": ["list_name"],
            }),
        }
    }

    async fn call(&self, arguments: &Value, _ctx: &CallContext) -> ToolReply {
        let list_name = match required_str(arguments, "list_name", "list_cards_in_list") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        ToolReply::Operation(self.intents.list_cards(list_name).await)
    }
}

struct CreateCardTool {
    intents: Arc<BoardIntents>,
}

#[async_trait]
impl ToolHandler for CreateCardTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "create_new_card",
            description: "Creates a new card in a named list. Not idempotent.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "card_name": { "type": "string", "description": "Title for the new card." },
                    "list_name": { "type": "string", "description": "List to create the card in." },
                    "description": { "type": "string", "description": "Optional card description." },
                },
                "required": ["card_name", "list_name"],
            }),
        }
    }

    async fn call(&self, arguments: &Value, _ctx: &CallContext) -> ToolReply {
        let card_name = match required_str(arguments, "card_name", "create_new_card") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        let list_name = match required_str(arguments, "list_name", "create_new_card") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        let description = optional_str(arguments, "description").unwrap_or("");
        ToolReply::Operation(self.intents.create_card(card_name, list_name, description).await)
    }
}

struct MoveCardTool {
    intents: Arc<BoardIntents>,
}

#[async_trait]
impl ToolHandler for MoveCardTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "move_card_between_lists",
            description: "Moves a named card from one list to another.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "card_name": { "type": "string", "description": "Name of the card to move." },
                    "source_list": { "type": "string", "description": "List the card is in now." },
                    "target_list": { "type": "string", "description": "List to move the card to." },
                },
                "required": ["card_name", "source_list", "target_list"],
            }),
        }
    }

    async fn call(&self, arguments: &Value, _ctx: &CallContext) -> ToolReply {
        let card_name = match required_str(arguments, "card_name", "move_card_between_lists") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        let source_list = match required_str(arguments, "source_list", "move_card_between_lists") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        let target_list = match required_str(arguments, "target_list", "move_card_between_lists") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        ToolReply::Operation(self.intents.move_card(card_name, source_list, target_list).await)
    }
}

struct UpdateCardTool {
    intents: Arc<BoardIntents>,
}

#[async_trait]
impl ToolHandler for UpdateCardTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "update_card_details",
            description: "Updates a card's name and/or description. At least one of \
                          new_name or new_description must be given.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "card_name": { "type": "string", "description": "Current name of the card." },
                    "list_name": { "type": "string", "description": "List the card is in." },
                    "new_name": { "type": "string", "description": "New card name." },
                    "new_description": { "type": "string", "description": "New card description." },
                },
                "required": ["card_name", "list_name"],
            }),
        }
    }

    async fn call(&self, arguments: &Value, _ctx: &CallContext) -> ToolReply {
        let card_name = match required_str(arguments, "card_name", "update_card_details") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        let list_name = match required_str(arguments, "list_name", "update_card_details") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        let new_name = optional_str(arguments, "new_name");
        let new_description = optional_str(arguments, "new_description");
        ToolReply::Operation(
            self.intents.update_card(card_name, list_name, new_name, new_description).await,
        )
    }
}

struct DailyReportTool {
    intents: Arc<BoardIntents>,
}

#[async_trait]
impl ToolHandler for DailyReportTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "generate_daily_stand_up",
            description: "Builds the daily stand-up report of cards updated today (UTC).",
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        }
    }

    async fn call(&self, _arguments: &Value, _ctx: &CallContext) -> ToolReply {
        ToolReply::Operation(self.intents.daily_report().await)
    }
}

const DEFAULT_CARD_NAME_QUESTION: &str = "What should the new card be called?";

/// Saves an awaiting-card-name session for the thread and surfaces the
/// question; the next message in the thread is treated as the card name.
struct AskCardNameTool {
    sessions: Arc<SessionStore>,
}

#[async_trait]
impl ToolHandler for AskCardNameTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "ask_card_name",
            description: "Asks the user what to call a new card when they requested a card \
                          without naming it. Use instead of inventing a card name.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "list_name": { "type": "string", "description": "List the card will go in." },
                    "question": { "type": "string", "description": "Optional custom question." },
                },
                "required": ["list_name"],
            }),
        }
    }

    async fn call(&self, arguments: &Value, ctx: &CallContext) -> ToolReply {
        let list_name = match required_str(arguments, "list_name", "ask_card_name") {
            Ok(value) => value,
            Err(reply) => return reply,
        };
        let question =
            optional_str(arguments, "question").unwrap_or(DEFAULT_CARD_NAME_QUESTION);

        self.sessions.start(
            ctx.thread_id.clone(),
            ConversationState::AwaitingCardName,
            HashMap::from([("list_name".to_string(), list_name.to_string())]),
        );
        ToolReply::Clarify { question: question.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use boardbot_core::ops::{BoardRef, CardRef, OperationResult};
    use boardbot_core::session::{ConversationState, SessionStore};
    use boardbot_trello::client::{ApiError, BoardApi, CardDetail, ListRef};
    use boardbot_trello::BoardIntents;

    use super::{board_tools, CallContext, ToolReply};

    struct StubBoardApi;

    #[async_trait]
    impl BoardApi for StubBoardApi {
        async fn list_boards(&self) -> Result<Vec<BoardRef>, ApiError> {
            Ok(vec![BoardRef { name: "Sprint Board".to_string(), id: "b-1".to_string() }])
        }

        async fn list_lists(&self, _board_id: &str) -> Result<Vec<ListRef>, ApiError> {
            Ok(vec![ListRef { name: "To Do".to_string(), id: "l-1".to_string() }])
        }

        async fn list_cards(&self, _list_id: &str) -> Result<Vec<CardRef>, ApiError> {
            Ok(vec![])
        }

        async fn create_card(
            &self,
            _list_id: &str,
            name: &str,
            _desc: &str,
        ) -> Result<CardRef, ApiError> {
            Ok(CardRef { name: name.to_string(), id: "c-new".to_string() })
        }

        async fn move_card(&self, _card_id: &str, _target_list_id: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn update_card(
            &self,
            _card_id: &str,
            _name: Option<&str>,
            _desc: Option<&str>,
        ) -> Result<(), ApiError> {
            Ok(())
        }

        async fn get_card(&self, _card_id: &str) -> Result<CardDetail, ApiError> {
            Err(ApiError::Status { status: 404, operation: "get_card" })
        }
    }

    fn context() -> CallContext {
        CallContext { thread_id: "1724.001".to_string(), channel_id: "C123".to_string() }
    }

    fn registry(sessions: Arc<SessionStore>) -> super::ToolRegistry {
        let intents = Arc::new(BoardIntents::new(Arc::new(StubBoardApi), "b-1"));
        board_tools(intents, sessions)
    }

    #[test]
    fn registry_is_the_closed_tool_table() {
        let registry = registry(Arc::new(SessionStore::default()));
        let names: Vec<_> = registry.specs().iter().map(|spec| spec.name).collect();
        assert_eq!(
            names,
            vec![
                "ask_card_name",
                "create_new_card",
                "generate_daily_stand_up",
                "list_boards",
                "list_cards_in_list",
                "move_card_between_lists",
                "update_card_details",
            ]
        );
        assert!(registry.get("drop_table").is_none());
    }

    #[tokio::test]
    async fn missing_required_arguments_become_error_results() {
        let registry = registry(Arc::new(SessionStore::default()));
        let tool = registry.get("create_new_card").expect("registered");

        let reply = tool.call(&json!({ "list_name": "To Do" }), &context()).await;
        assert!(matches!(
            reply,
            ToolReply::Operation(OperationResult::Error { ref message, .. })
                if message.contains("card_name")
        ));
    }

    #[tokio::test]
    async fn ask_card_name_saves_the_session_and_asks() {
        let sessions = Arc::new(SessionStore::default());
        let registry = registry(sessions.clone());
        let tool = registry.get("ask_card_name").expect("registered");

        let reply = tool.call(&json!({ "list_name": "To Do" }), &context()).await;
        assert_eq!(
            reply,
            ToolReply::Clarify { question: "What should the new card be called?".to_string() }
        );

        let session = sessions.get("1724.001").expect("session saved");
        assert_eq!(session.state, ConversationState::AwaitingCardName);
        assert_eq!(session.context.get("list_name").map(String::as_str), Some("To Do"));
    }

    #[tokio::test]
    async fn create_card_round_trips_through_the_registry() {
        let registry = registry(Arc::new(SessionStore::default()));
        let tool = registry.get("create_new_card").expect("registered");

        let reply = tool
            .call(&json!({ "card_name": "Buy milk", "list_name": "to do" }), &context())
            .await;
        assert_eq!(
            reply,
            ToolReply::Operation(OperationResult::CardCreated {
                card_name: "Buy milk".to_string(),
                list_name: "To Do".to_string(),
            })
        );
    }
}
