use serde::Serialize;
use serde_json::json;

use boardbot_core::ops::{BoardRef, CardRef, UpdatedField};

/// Reports longer than this are split into per-section blocks.
pub const REPORT_SPLIT_THRESHOLD: usize = 500;

/// Report sections are delimited by this marker in the raw text.
pub const REPORT_SECTION_DELIMITER: &str = "##";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into(), emoji: true }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    kind: &'static str,
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: "button",
            action_id: action_id.into(),
            text: TextObject::plain(label),
            value: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        block_id: String,
        text: TextObject,
    },
    Divider,
    Section {
        block_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<ButtonElement>,
    },
    Actions {
        block_id: String,
        elements: Vec<ButtonElement>,
    },
}

/// Fallback text plus the Block Kit payload for one outbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks
            .push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::Divider);
        self
    }

    pub fn section(mut self, block_id: impl Into<String>, text: TextObject) -> Self {
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory: None });
        self
    }

    pub fn section_with_button(
        mut self,
        block_id: impl Into<String>,
        text: TextObject,
        button: ButtonElement,
    ) -> Self {
        self.blocks.push(Block::Section {
            block_id: block_id.into(),
            text,
            accessory: Some(button),
        });
        self
    }

    pub fn actions(mut self, block_id: impl Into<String>, elements: Vec<ButtonElement>) -> Self {
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements });
        self
    }

    pub fn build(mut self) -> MessageTemplate {
        if matches!(self.blocks.last(), Some(Block::Divider)) {
            self.blocks.pop();
        }
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

/// Header, one bullet line per card with a Move Card accessory, and a
/// Create New Card action at the bottom. Button values carry a structured
/// payload so the interactive continuation can recover the list and card.
pub fn cards_list_message(list_name: &str, cards: &[CardRef]) -> MessageTemplate {
    let fallback = if cards.is_empty() {
        format!("📋 The list '{list_name}' has no cards.")
    } else {
        format!("📋 Found {} card(s) in '{list_name}'.", cards.len())
    };

    let mut builder = MessageBuilder::new(fallback)
        .header("board.cards.header.v1", format!("📋 Cards in '{list_name}'"))
        .divider();

    if cards.is_empty() {
        builder = builder
            .section("board.cards.empty.v1", TextObject::mrkdwn("_No cards in this list_"));
    } else {
        for (index, card) in cards.iter().enumerate() {
            let payload = json!({
                "action": "move_card",
                "source_list": list_name,
                "card_name": card.name,
            });
            builder = builder.section_with_button(
                format!("board.cards.item.{}.v1", index + 1),
                TextObject::mrkdwn(format!("• {}", card.name)),
                ButtonElement::new("board.card.move.v1", "Move Card").value(payload.to_string()),
            );
        }
    }

    let create_payload = json!({ "action": "create_card", "list_name": list_name });
    builder
        .actions(
            "board.cards.actions.v1",
            vec![ButtonElement::new("board.card.create.v1", "Create New Card")
                .value(create_payload.to_string())],
        )
        .build()
}

pub fn boards_list_message(boards: &[BoardRef]) -> MessageTemplate {
    if boards.is_empty() {
        return MessageBuilder::new("📋 No Trello boards found.")
            .section("board.boards.empty.v1", TextObject::mrkdwn("📋 No Trello boards found."))
            .build();
    }

    let mut builder =
        MessageBuilder::new(format!("📋 Found {} Trello board(s).", boards.len()))
            .header("board.boards.header.v1", "📋 Your Trello Boards")
            .divider();
    for (index, board) in boards.iter().enumerate() {
        builder = builder.section(
            format!("board.boards.item.{}.v1", index + 1),
            TextObject::mrkdwn(format!("• {}", board.name)),
        );
    }
    builder.build()
}

pub fn success_message(sentence: &str) -> MessageTemplate {
    MessageBuilder::new(sentence.to_owned())
        .section("board.success.header.v1", TextObject::mrkdwn("✅ *Success*"))
        .section("board.success.body.v1", TextObject::mrkdwn(sentence))
        .build()
}

pub fn card_created_message(card_name: &str, list_name: &str) -> MessageTemplate {
    success_message(&format!(
        "✅ Successfully created card '{card_name}' in list '{list_name}'."
    ))
}

pub fn card_moved_message(card_name: &str, source_list: &str, target_list: &str) -> MessageTemplate {
    success_message(&format!(
        "✅ Successfully moved card '{card_name}' from '{source_list}' to '{target_list}'."
    ))
}

pub fn card_updated_message(card_name: &str, updated_fields: &[UpdatedField]) -> MessageTemplate {
    let updates_text = if updated_fields.is_empty() {
        "details".to_string()
    } else {
        updated_fields.iter().map(UpdatedField::label).collect::<Vec<_>>().join(" and ")
    };
    success_message(&format!("✅ Successfully updated {updates_text} of card '{card_name}'."))
}

pub fn error_message(message: &str, suggestions: &[String]) -> MessageTemplate {
    let mut builder = MessageBuilder::new(format!("❌ {message}"))
        .section("board.error.header.v1", TextObject::mrkdwn("❌ *Error*"))
        .section("board.error.body.v1", TextObject::mrkdwn(message));

    if !suggestions.is_empty() {
        let joined =
            suggestions.iter().map(|name| format!("`{name}`")).collect::<Vec<_>>().join(", ");
        builder = builder.section(
            "board.error.suggestions.v1",
            TextObject::mrkdwn(format!("Did you mean one of these? {joined}")),
        );
    }

    builder.build()
}

/// Short reports go out as one plain block; long or sectioned reports split
/// into a titled header, the date line, then one titled sub-block per
/// delimiter-separated section. A trailing divider is never emitted.
pub fn daily_report_message(report_text: &str) -> MessageTemplate {
    let needs_split = report_text.len() > REPORT_SPLIT_THRESHOLD
        || report_text.contains(REPORT_SECTION_DELIMITER);
    if !needs_split {
        return MessageBuilder::new(report_text.to_owned())
            .section("board.report.body.v1", TextObject::mrkdwn(report_text))
            .build();
    }

    let mut sections = report_text.split(REPORT_SECTION_DELIMITER);
    let preamble = sections.next().unwrap_or_default();

    let mut builder = MessageBuilder::new("📊 Daily Stand-Up Summary")
        .header("board.report.header.v1", "Daily Stand-Up Summary");

    if let Some(date_line) = preamble.lines().find(|line| line.contains("Date:")) {
        builder = builder
            .section("board.report.date.v1", TextObject::mrkdwn(date_line.trim().to_owned()));
    }
    builder = builder.divider();

    for (index, section_text) in sections.enumerate() {
        let mut lines = section_text.trim().lines();
        let Some(title) = lines.next() else {
            continue;
        };
        if title.trim().is_empty() {
            continue;
        }

        builder = builder.section(
            format!("board.report.section.{}.title.v1", index + 1),
            TextObject::mrkdwn(format!("*{}*", title.trim())),
        );
        let body = lines.collect::<Vec<_>>().join("\n");
        let body = body.trim();
        if !body.is_empty() {
            builder = builder.section(
                format!("board.report.section.{}.body.v1", index + 1),
                TextObject::mrkdwn(body.to_owned()),
            );
        }
        builder = builder.divider();
    }

    builder.build()
}
