//! Wire shapes returned by the bridge.

use serde::Deserialize;
use serde_json::Value;

use tgpurge_core::domain::{
    Chat, ChatId, ChatKind, HistoryMessage, MessageId, ReactionRecord, ReactionSummary,
};

#[derive(Debug, Deserialize)]
pub struct ChatDto {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<ChatDto> for Chat {
    fn from(c: ChatDto) -> Self {
        let kind = match c.kind.to_ascii_lowercase().as_str() {
            "private" | "direct" | "bot" => ChatKind::Direct,
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            _ => ChatKind::Other,
        };
        let title = c
            .title
            .or(c.first_name)
            .unwrap_or_else(|| c.id.to_string());
        Chat {
            id: ChatId(c.id),
            title,
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageDto {
    #[serde(alias = "message_id")]
    pub id: i32,
    /// Shape varies across platform versions; decoded leniently.
    #[serde(default)]
    pub reactions: Option<Value>,
}

impl MessageDto {
    pub fn id(&self) -> MessageId {
        MessageId(self.id)
    }

    pub fn into_history(self) -> HistoryMessage {
        HistoryMessage {
            id: MessageId(self.id),
            reactions: self.reactions.as_ref().map(reaction_summary),
        }
    }
}

/// Decode a reaction summary without failing on unknown shapes.
///
/// Accepts `{"reactions": [...]}`, `{"results": [...]}` or a bare list of
/// records. Anything else is kept as [`ReactionSummary::Opaque`].
pub fn reaction_summary(v: &Value) -> ReactionSummary {
    let list = match v {
        Value::Array(xs) => xs,
        Value::Object(map) => match map.get("reactions").or_else(|| map.get("results")) {
            Some(Value::Array(xs)) => xs,
            _ => return ReactionSummary::Opaque,
        },
        _ => return ReactionSummary::Opaque,
    };
    ReactionSummary::Records(list.iter().map(reaction_record).collect())
}

fn reaction_record(v: &Value) -> ReactionRecord {
    let emoji = v
        .get("emoji")
        .or_else(|| v.get("reaction").and_then(|r| r.get("emoji")))
        .or_else(|| v.get("type").and_then(|t| t.get("emoji")))
        .and_then(Value::as_str)
        .map(str::to_string);
    let count = v
        .get("count")
        .or_else(|| v.get("total_count"))
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);
    // Any non-null marker means the account reacted; an order we cannot
    // read as an i32 still counts, at position 0.
    let chosen_order = match v.get("chosen_order") {
        None | Some(Value::Null) => None,
        Some(marker) => Some(
            marker
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .unwrap_or(0),
        ),
    };
    ReactionRecord {
        emoji,
        count,
        chosen_order,
    }
}
