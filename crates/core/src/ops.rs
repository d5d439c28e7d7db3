use serde::{Deserialize, Serialize};

/// A board name/id pair as returned by the board service, in service order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRef {
    pub name: String,
    pub id: String,
}

/// A card name/id pair within a list, in service order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub name: String,
    pub id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatedField {
    Name,
    Description,
}

impl UpdatedField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
        }
    }
}

/// The structured outcome of executing a single board tool.
///
/// Exactly one variant per result; `Error` carries no type-specific payload
/// beyond the message and optional name suggestions. Display formatting is
/// the response coordinator's job, never this type's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationResult {
    BoardsList {
        boards: Vec<BoardRef>,
    },
    CardsList {
        list_name: String,
        cards: Vec<CardRef>,
    },
    CardCreated {
        card_name: String,
        list_name: String,
    },
    CardMoved {
        card_name: String,
        source_list: String,
        target_list: String,
    },
    CardUpdated {
        card_name: String,
        updated_fields: Vec<UpdatedField>,
    },
    DailySummary {
        report_text: String,
        card_count: usize,
    },
    Error {
        message: String,
        suggestions: Vec<String>,
    },
}

impl OperationResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into(), suggestions: Vec::new() }
    }

    pub fn error_with_suggestions(message: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::Error { message: message.into(), suggestions }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Short tag used in tracing fields and tool-result history entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BoardsList { .. } => "boards_list",
            Self::CardsList { .. } => "cards_list",
            Self::CardCreated { .. } => "card_created",
            Self::CardMoved { .. } => "card_moved",
            Self::CardUpdated { .. } => "card_updated",
            Self::DailySummary { .. } => "daily_summary",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OperationResult, UpdatedField};

    #[test]
    fn error_constructor_suppresses_suggestions_by_default() {
        let result = OperationResult::error("list not found");
        assert!(result.is_error());
        assert!(matches!(
            result,
            OperationResult::Error { ref suggestions, .. } if suggestions.is_empty()
        ));
    }

    #[test]
    fn kind_tags_are_stable() {
        let result = OperationResult::CardUpdated {
            card_name: "Fix login bug".to_string(),
            updated_fields: vec![UpdatedField::Name, UpdatedField::Description],
        };
        assert_eq!(result.kind(), "card_updated");
        assert!(!result.is_error());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let result = OperationResult::CardCreated {
            card_name: "Buy milk".to_string(),
            list_name: "To Do".to_string(),
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["kind"], "card_created");
        assert_eq!(json["card_name"], "Buy milk");
    }
}
