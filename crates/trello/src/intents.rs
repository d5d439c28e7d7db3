use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::warn;

use boardbot_core::ops::{CardRef, OperationResult, UpdatedField};

use crate::client::{ApiError, BoardApi, ListRef};

/// Intent-level board operations, resolving lists and cards by name against
/// fresh snapshots fetched from the remote service.
///
/// Every method returns an `OperationResult`; remote failures and unresolved
/// names become `Error` results here and never propagate as `Err`.
pub struct BoardIntents {
    api: Arc<dyn BoardApi>,
    board_id: String,
}

enum Resolution {
    Match { name: String, id: String },
    NotFound { suggestions: Vec<String> },
}

impl BoardIntents {
    pub fn new(api: Arc<dyn BoardApi>, board_id: impl Into<String>) -> Self {
        Self { api, board_id: board_id.into() }
    }

    pub async fn list_boards(&self) -> OperationResult {
        match self.api.list_boards().await {
            Ok(boards) => OperationResult::BoardsList { boards },
            Err(error) => transient(
                "Unable to retrieve your Trello boards. Please try again later.",
                &error,
            ),
        }
    }

    pub async fn list_cards(&self, list_name: &str) -> OperationResult {
        let lists = match self.fetch_lists().await {
            Ok(lists) => lists,
            Err(result) => return result,
        };

        let (actual_name, list_id) = match resolve_list(list_name, &lists) {
            Resolution::Match { name, id } => (name, id),
            Resolution::NotFound { suggestions } => {
                return list_not_found(list_name, suggestions)
            }
        };

        match self.api.list_cards(&list_id).await {
            Ok(cards) => OperationResult::CardsList { list_name: actual_name, cards },
            Err(error) => transient(
                format!("Unable to retrieve cards from '{actual_name}'. Please try again later."),
                &error,
            ),
        }
    }

    /// Creates a card in the named list. Not idempotent; callers must not
    /// retry blindly on ambiguous failures.
    pub async fn create_card(
        &self,
        card_name: &str,
        list_name: &str,
        description: &str,
    ) -> OperationResult {
        let lists = match self.fetch_lists().await {
            Ok(lists) => lists,
            Err(result) => return result,
        };

        let (actual_name, list_id) = match resolve_list(list_name, &lists) {
            Resolution::Match { name, id } => (name, id),
            Resolution::NotFound { suggestions } => {
                return list_not_found(list_name, suggestions)
            }
        };

        match self.api.create_card(&list_id, card_name, description).await {
            Ok(_) => OperationResult::CardCreated {
                card_name: card_name.to_string(),
                list_name: actual_name,
            },
            Err(error) => transient(format!("Failed to create card '{card_name}'."), &error),
        }
    }

    pub async fn move_card(
        &self,
        card_name: &str,
        source_list: &str,
        target_list: &str,
    ) -> OperationResult {
        let lists = match self.fetch_lists().await {
            Ok(lists) => lists,
            Err(result) => return result,
        };

        let (source_name, source_id) = match resolve_list(source_list, &lists) {
            Resolution::Match { name, id } => (name, id),
            Resolution::NotFound { suggestions } => {
                return OperationResult::error_with_suggestions(
                    format!("Source list '{source_list}' not found on the board."),
                    suggestions,
                )
            }
        };
        let (target_name, target_id) = match resolve_list(target_list, &lists) {
            Resolution::Match { name, id } => (name, id),
            Resolution::NotFound { suggestions } => {
                return OperationResult::error_with_suggestions(
                    format!("Target list '{target_list}' not found on the board."),
                    suggestions,
                )
            }
        };

        let cards = match self.api.list_cards(&source_id).await {
            Ok(cards) => cards,
            Err(error) => {
                return transient(
                    format!(
                        "Unable to retrieve cards from '{source_name}'. Please try again later."
                    ),
                    &error,
                )
            }
        };

        let (card_actual_name, card_id) = match resolve_card(card_name, &cards) {
            Resolution::Match { name, id } => (name, id),
            Resolution::NotFound { suggestions } => {
                return OperationResult::error_with_suggestions(
                    format!("Card '{card_name}' not found in list '{source_name}'."),
                    suggestions,
                )
            }
        };

        match self.api.move_card(&card_id, &target_id).await {
            Ok(()) => OperationResult::CardMoved {
                card_name: card_actual_name,
                source_list: source_name,
                target_list: target_name,
            },
            Err(error) => transient(
                format!("Failed to move card '{card_actual_name}'. Please try again later."),
                &error,
            ),
        }
    }

    pub async fn update_card(
        &self,
        card_name: &str,
        list_name: &str,
        new_name: Option<&str>,
        new_description: Option<&str>,
    ) -> OperationResult {
        if new_name.is_none() && new_description.is_none() {
            return OperationResult::error(
                "No updates specified. Please provide a new name or description.",
            );
        }

        let lists = match self.fetch_lists().await {
            Ok(lists) => lists,
            Err(result) => return result,
        };

        let (actual_list_name, list_id) = match resolve_list(list_name, &lists) {
            Resolution::Match { name, id } => (name, id),
            Resolution::NotFound { suggestions } => {
                return list_not_found(list_name, suggestions)
            }
        };

        let cards = match self.api.list_cards(&list_id).await {
            Ok(cards) => cards,
            Err(error) => {
                return transient(
                    format!(
                        "Unable to retrieve cards from '{actual_list_name}'. \
                         Please try again later."
                    ),
                    &error,
                )
            }
        };

        let (card_actual_name, card_id) = match resolve_card(card_name, &cards) {
            Resolution::Match { name, id } => (name, id),
            Resolution::NotFound { suggestions } => {
                return OperationResult::error_with_suggestions(
                    format!("Card '{card_name}' not found in list '{actual_list_name}'."),
                    suggestions,
                )
            }
        };

        match self.api.update_card(&card_id, new_name, new_description).await {
            Ok(()) => {
                let mut updated_fields = Vec::new();
                if new_name.is_some() {
                    updated_fields.push(UpdatedField::Name);
                }
                if new_description.is_some() {
                    updated_fields.push(UpdatedField::Description);
                }
                OperationResult::CardUpdated { card_name: card_actual_name, updated_fields }
            }
            Err(error) => transient(
                format!("Failed to update card '{card_actual_name}'. Please try again later."),
                &error,
            ),
        }
    }

    /// Builds the daily stand-up report for the current UTC calendar date.
    pub async fn daily_report(&self) -> OperationResult {
        self.daily_report_for_date(Utc::now().date_naive()).await
    }

    /// Fetches every list, every card per list, then full detail per card,
    /// and keeps the cards whose last activity falls on `today`. This is the
    /// expensive fan-out path; detail fetches run sequentially for now and
    /// are a candidate for later parallelization.
    pub async fn daily_report_for_date(&self, today: NaiveDate) -> OperationResult {
        let lists = match self.fetch_lists().await {
            Ok(lists) => lists,
            Err(result) => return result,
        };

        let mut today_cards = Vec::new();
        for list in &lists {
            let cards = match self.api.list_cards(&list.id).await {
                Ok(cards) => cards,
                Err(error) => {
                    return transient(
                        format!(
                            "Unable to retrieve cards from '{}'. Please try again later.",
                            list.name
                        ),
                        &error,
                    )
                }
            };

            for card in cards {
                match self.api.get_card(&card.id).await {
                    Ok(detail) => {
                        if detail.date_last_activity.date_naive() == today {
                            today_cards.push(detail);
                        }
                    }
                    Err(error) => {
                        // One unreadable card does not sink the whole report.
                        warn!(card_id = %card.id, error = %error, "skipping card detail fetch");
                    }
                }
            }
        }

        let mut report_text = String::from("# Daily Stand-Up Summary\n\n");
        report_text.push_str(&format!("Date: {}\n\n", today.format("%d/%m/%Y")));

        if today_cards.is_empty() {
            report_text.push_str("No cards were updated today.\n");
            return OperationResult::DailySummary { report_text, card_count: 0 };
        }

        report_text.push_str(&format!("## Cards Updated Today ({})\n\n", today_cards.len()));
        for card in &today_cards {
            let status = if card.closed { "Closed" } else { "Open" };
            let description =
                if card.desc.is_empty() { "No description" } else { card.desc.as_str() };
            report_text.push_str(&format!("### {}\n", card.name));
            report_text.push_str(&format!("- **Status:** {status}\n"));
            report_text.push_str(&format!("- **Description:** {description}\n"));
            report_text
                .push_str(&format!("- **Last Updated:** {}\n", card.date_last_activity));
            report_text.push_str(&format!("- **URL:** {}\n\n", card.url));
        }

        OperationResult::DailySummary { report_text, card_count: today_cards.len() }
    }

    async fn fetch_lists(&self) -> Result<Vec<ListRef>, OperationResult> {
        self.api.list_lists(&self.board_id).await.map_err(|error| {
            transient("Unable to retrieve lists from the board. Please try again later.", &error)
        })
    }
}

fn transient(message: impl Into<String>, error: &ApiError) -> OperationResult {
    let message = message.into();
    warn!(error = %error, "board service call failed");
    OperationResult::error(message)
}

fn list_not_found(list_name: &str, suggestions: Vec<String>) -> OperationResult {
    OperationResult::error_with_suggestions(
        format!("List '{list_name}' not found on the board."),
        suggestions,
    )
}

fn resolve_list(query: &str, lists: &[ListRef]) -> Resolution {
    resolve(query, lists.iter().map(|list| (list.name.as_str(), list.id.as_str())))
}

fn resolve_card(query: &str, cards: &[CardRef]) -> Resolution {
    resolve(query, cards.iter().map(|card| (card.name.as_str(), card.id.as_str())))
}

/// Case-insensitive exact match first; on a miss, suggestions are all names
/// containing the query as a substring in either direction, in entry order.
fn resolve<'a>(query: &str, entries: impl Iterator<Item = (&'a str, &'a str)>) -> Resolution {
    let needle = query.to_lowercase();
    let mut suggestions = Vec::new();

    for (name, id) in entries {
        let candidate = name.to_lowercase();
        if candidate == needle {
            return Resolution::Match { name: name.to_string(), id: id.to_string() };
        }
        if candidate.contains(&needle) || needle.contains(&candidate) {
            suggestions.push(name.to_string());
        }
    }

    Resolution::NotFound { suggestions }
}
