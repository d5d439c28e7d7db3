use std::sync::Arc;

use tracing::info;

use boardbot_core::ops::OperationResult;

use crate::blocks::{
    boards_list_message, card_created_message, card_moved_message, card_updated_message,
    cards_list_message, daily_report_message, error_message, MessageTemplate,
};
use crate::notifier::{DeliveryReceipt, Notifier};

/// The single place where operation results become user-visible messages.
///
/// Rendering is a pure function of the result; delivery happens exactly once
/// per turn, enforced by the caller's response flag rather than here.
pub struct ResponseCoordinator {
    notifier: Arc<dyn Notifier>,
}

impl ResponseCoordinator {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn render(result: &OperationResult) -> MessageTemplate {
        match result {
            OperationResult::BoardsList { boards } => boards_list_message(boards),
            OperationResult::CardsList { list_name, cards } => {
                cards_list_message(list_name, cards)
            }
            OperationResult::CardCreated { card_name, list_name } => {
                card_created_message(card_name, list_name)
            }
            OperationResult::CardMoved { card_name, source_list, target_list } => {
                card_moved_message(card_name, source_list, target_list)
            }
            OperationResult::CardUpdated { card_name, updated_fields } => {
                card_updated_message(card_name, updated_fields)
            }
            OperationResult::DailySummary { report_text, .. } => {
                daily_report_message(report_text)
            }
            OperationResult::Error { message, suggestions } => {
                error_message(message, suggestions)
            }
        }
    }

    pub async fn send(
        &self,
        result: &OperationResult,
        channel_id: &str,
        thread_ts: Option<&str>,
    ) -> DeliveryReceipt {
        let template = Self::render(result);
        let receipt = self
            .notifier
            .send(&template.fallback_text, channel_id, Some(&template.blocks), thread_ts)
            .await;
        info!(
            event_name = "egress.slack.response_sent",
            result_kind = result.kind(),
            channel_id,
            delivered = receipt.ok,
            "delivered turn response"
        );
        receipt
    }

    /// Conversational replies and clarifying questions go out unformatted.
    pub async fn send_text(
        &self,
        text: &str,
        channel_id: &str,
        thread_ts: Option<&str>,
    ) -> DeliveryReceipt {
        self.notifier.send(text, channel_id, None, thread_ts).await
    }

    /// Plain-text progress note while a longer turn is still running.
    pub async fn send_progress(
        &self,
        text: &str,
        channel_id: &str,
        thread_ts: Option<&str>,
    ) -> DeliveryReceipt {
        self.send_text(text, channel_id, thread_ts).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use boardbot_core::ops::{CardRef, OperationResult};

    use super::ResponseCoordinator;
    use crate::notifier::RecordingNotifier;

    #[tokio::test]
    async fn send_delivers_rendered_blocks_in_thread() {
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = ResponseCoordinator::new(notifier.clone());

        let result = OperationResult::CardsList {
            list_name: "To Do".to_string(),
            cards: vec![CardRef { name: "Fix login bug".to_string(), id: "c-1".to_string() }],
        };
        let receipt = coordinator.send(&result, "C123", Some("1724.001")).await;

        assert!(receipt.ok);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel_id, "C123");
        assert_eq!(sent[0].thread_ts.as_deref(), Some("1724.001"));
        assert!(sent[0].block_count > 1);
        assert_eq!(sent[0].text, "📋 Found 1 card(s) in 'To Do'.");
    }

    #[tokio::test]
    async fn progress_updates_go_out_as_plain_text() {
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = ResponseCoordinator::new(notifier.clone());

        coordinator.send_progress("Processing your request...", "C123", None).await;

        let sent = notifier.sent();
        assert_eq!(sent[0].block_count, 0);
        assert_eq!(sent[0].text, "Processing your request...");
    }

    #[test]
    fn every_result_kind_renders_a_nonempty_template() {
        let results = vec![
            OperationResult::BoardsList { boards: vec![] },
            OperationResult::CardsList { list_name: "To Do".to_string(), cards: vec![] },
            OperationResult::CardCreated {
                card_name: "X".to_string(),
                list_name: "To Do".to_string(),
            },
            OperationResult::CardMoved {
                card_name: "X".to_string(),
                source_list: "A".to_string(),
                target_list: "B".to_string(),
            },
            OperationResult::CardUpdated { card_name: "X".to_string(), updated_fields: vec![] },
            OperationResult::DailySummary {
                report_text: "All quiet.".to_string(),
                card_count: 0,
            },
            OperationResult::error("boom"),
        ];

        for result in results {
            let template = ResponseCoordinator::render(&result);
            assert!(!template.blocks.is_empty(), "no blocks for {:?}", result.kind());
            assert!(!template.fallback_text.is_empty());
        }
    }
}
