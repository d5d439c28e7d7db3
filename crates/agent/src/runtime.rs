use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use boardbot_core::message::Message;
use boardbot_core::ops::OperationResult;
use boardbot_core::session::{ConversationState, SessionStore};
use boardbot_slack::{ResponseCoordinator, TurnRequest};

use crate::reasoner::{Reasoner, ReasonerReply};
use crate::tools::{CallContext, ToolRegistry, ToolReply};

pub const SYSTEM_PROMPT: &str = "You are a helpful Trello assistant integrated with Slack.\n\
You manage Trello boards, lists, and cards using the available tools.\n\
\n\
IMPORTANT:\n\
1. Tools return structured data, not send messages\n\
2. Be conversational and helpful\n\
3. For simple greetings or questions, respond naturally without tools\n\
4. For Trello operations, use the appropriate tool\n\
5. Never invent a card name; use ask_card_name when the user did not give one\n";

const PROGRESS_TEXT: &str = "🔍 Processing your request...";
const CYCLE_LIMIT_MESSAGE: &str =
    "The request took too many steps to complete. Please try a simpler request.";

/// One inbound request being worked: its history, cycle budget, and the flag
/// that enforces single delivery.
struct Turn {
    request: TurnRequest,
    correlation_id: Uuid,
    history: Vec<Message>,
    cycles_used: u32,
    last_result: Option<OperationResult>,
    response_sent: bool,
}

impl Turn {
    fn new(request: TurnRequest) -> Self {
        Self {
            request,
            correlation_id: Uuid::new_v4(),
            history: Vec::new(),
            cycles_used: 0,
            last_result: None,
            response_sent: false,
        }
    }
}

/// What `Respond` delivers: a rendered operation result when tools ran, or
/// plain conversational text when none did.
enum Outcome {
    Text(String),
    Result(OperationResult),
}

enum LoopState {
    Start,
    CheckContinuation,
    Reasoning,
    ToolDispatch { name: String, arguments: Value },
    ExtractResults { name: String, reply: ToolReply },
    Respond(Outcome),
    End,
}

pub struct AgentRuntime {
    reasoner: Arc<dyn Reasoner>,
    tools: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    coordinator: Arc<ResponseCoordinator>,
    max_cycles: u32,
}

impl AgentRuntime {
    pub fn new(
        reasoner: Arc<dyn Reasoner>,
        tools: Arc<ToolRegistry>,
        sessions: Arc<SessionStore>,
        coordinator: Arc<ResponseCoordinator>,
        max_cycles: u32,
    ) -> Self {
        Self { reasoner, tools, sessions, coordinator, max_cycles }
    }

    /// Runs one turn to completion. Exactly one user-visible response is
    /// delivered, no matter how the loop terminates.
    pub async fn run_turn(&self, request: TurnRequest) {
        let mut turn = Turn::new(request);
        let ctx = CallContext {
            thread_id: turn.request.thread_id.clone(),
            channel_id: turn.request.channel_id.clone(),
        };

        let mut state = LoopState::Start;
        loop {
            state = match state {
                LoopState::Start => {
                    info!(
                        event_name = "agent.turn_started",
                        correlation_id = %turn.correlation_id,
                        thread_id = %turn.request.thread_id,
                        channel_id = %turn.request.channel_id,
                        "turn started"
                    );
                    self.coordinator
                        .send_progress(
                            PROGRESS_TEXT,
                            &turn.request.channel_id,
                            Some(&turn.request.thread_id),
                        )
                        .await;
                    LoopState::CheckContinuation
                }
                LoopState::CheckContinuation => {
                    let mut next = None;
                    if let Some(session) = self.sessions.take(&turn.request.thread_id) {
                        match session.state {
                            ConversationState::AwaitingCardName => {
                                match session.context.get("list_name") {
                                    Some(list_name) => {
                                        info!(
                                            event_name = "agent.continuation_resumed",
                                            correlation_id = %turn.correlation_id,
                                            thread_id = %turn.request.thread_id,
                                            "resuming awaiting-card-name session"
                                        );
                                        turn.history.push(Message::system(format!(
                                            "The user was previously asked what to call a new \
                                             card in the list '{list_name}'. Treat their next \
                                             message as the card name and create the card with \
                                             create_new_card."
                                        )));
                                    }
                                    // Never guess the list; report and start over.
                                    None => {
                                        warn!(
                                            event_name = "agent.continuation_context_missing",
                                            correlation_id = %turn.correlation_id,
                                            thread_id = %turn.request.thread_id,
                                            "saved session has no list_name"
                                        );
                                        next = Some(LoopState::Respond(Outcome::Result(
                                            OperationResult::error(
                                                "I couldn't recover which list your new card \
                                                 belongs to. Please start the request again.",
                                            ),
                                        )));
                                    }
                                }
                            }
                        }
                    }
                    match next {
                        Some(state) => state,
                        None => {
                            turn.history.push(Message::user(turn.request.text.clone()));
                            LoopState::Reasoning
                        }
                    }
                }
                LoopState::Reasoning => {
                    match self.reasoner.invoke(SYSTEM_PROMPT, &turn.history).await {
                        Ok(ReasonerReply::Text(text)) => {
                            turn.history.push(Message::assistant(text.clone()));
                            match turn.last_result.take() {
                                Some(result) => LoopState::Respond(Outcome::Result(result)),
                                None => LoopState::Respond(Outcome::Text(text)),
                            }
                        }
                        Ok(ReasonerReply::ToolRequest { name, arguments }) => {
                            turn.history
                                .push(Message::tool_request(name.clone(), arguments.clone()));
                            LoopState::ToolDispatch { name, arguments }
                        }
                        Err(error) => {
                            warn!(
                                event_name = "agent.reasoner_failed",
                                correlation_id = %turn.correlation_id,
                                error = %error,
                                "model invocation failed"
                            );
                            LoopState::Respond(Outcome::Result(OperationResult::error(
                                error.to_string(),
                            )))
                        }
                    }
                }
                LoopState::ToolDispatch { name, arguments } => {
                    turn.cycles_used += 1;
                    if turn.cycles_used > self.max_cycles {
                        warn!(
                            event_name = "agent.cycle_limit_exceeded",
                            correlation_id = %turn.correlation_id,
                            max_cycles = self.max_cycles,
                            "aborting turn at the cycle limit"
                        );
                        LoopState::Respond(Outcome::Result(OperationResult::error(
                            CYCLE_LIMIT_MESSAGE,
                        )))
                    } else {
                        let reply = match self.tools.get(&name) {
                            Some(handler) => handler.call(&arguments, &ctx).await,
                            None => ToolReply::Operation(OperationResult::error(format!(
                                "Unknown tool '{name}'."
                            ))),
                        };
                        LoopState::ExtractResults { name, reply }
                    }
                }
                LoopState::ExtractResults { name, reply } => match reply {
                    ToolReply::Operation(result) => {
                        info!(
                            event_name = "agent.tool_completed",
                            correlation_id = %turn.correlation_id,
                            tool = %name,
                            result_kind = result.kind(),
                            cycles_used = turn.cycles_used,
                            "tool dispatch completed"
                        );
                        turn.history.push(Message::tool_result(name, result.clone()));
                        turn.last_result = Some(result);
                        LoopState::Reasoning
                    }
                    ToolReply::Clarify { question } => {
                        info!(
                            event_name = "agent.clarification_requested",
                            correlation_id = %turn.correlation_id,
                            tool = %name,
                            "ending turn with a clarifying question"
                        );
                        LoopState::Respond(Outcome::Text(question))
                    }
                },
                LoopState::Respond(outcome) => {
                    if turn.response_sent {
                        warn!(
                            event_name = "agent.duplicate_response_suppressed",
                            correlation_id = %turn.correlation_id,
                            "response already delivered for this turn"
                        );
                    } else {
                        turn.response_sent = true;
                        match outcome {
                            Outcome::Text(text) => {
                                self.coordinator
                                    .send_text(
                                        &text,
                                        &turn.request.channel_id,
                                        Some(&turn.request.thread_id),
                                    )
                                    .await;
                            }
                            Outcome::Result(result) => {
                                self.coordinator
                                    .send(
                                        &result,
                                        &turn.request.channel_id,
                                        Some(&turn.request.thread_id),
                                    )
                                    .await;
                            }
                        }
                    }
                    LoopState::End
                }
                LoopState::End => {
                    info!(
                        event_name = "agent.turn_completed",
                        correlation_id = %turn.correlation_id,
                        thread_id = %turn.request.thread_id,
                        cycles_used = turn.cycles_used,
                        "turn completed"
                    );
                    break;
                }
            };
        }
    }
}
