use std::fmt;

/// Platform chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat-scoped message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Direct,
    Group,
    Supergroup,
    Channel,
    Other,
}

impl ChatKind {
    /// Only basic groups and supergroups are cleaned.
    pub fn is_group_like(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// A conversation as listed by the messaging client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    pub kind: ChatKind,
}

impl Chat {
    pub fn new(id: i64, title: impl Into<String>, kind: ChatKind) -> Self {
        Self {
            id: ChatId(id),
            title: title.into(),
            kind,
        }
    }
}

/// One per-emoji aggregate inside a message's reaction summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReactionRecord {
    pub emoji: Option<String>,
    pub count: u32,
    /// Present only when the current user placed this reaction.
    pub chosen_order: Option<i32>,
}

/// Reaction summary as exposed by the platform.
///
/// Platform versions disagree on the shape; anything the adapter could not
/// decode into records is kept as `Opaque` and never counts as ours.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ReactionSummary {
    Records(Vec<ReactionRecord>),
    #[default]
    Opaque,
}

impl ReactionSummary {
    /// Whether the current user reacted to the message at all, with any emoji.
    pub fn has_own_reaction(&self) -> bool {
        match self {
            Self::Records(recs) => recs.iter().any(|r| r.chosen_order.is_some()),
            Self::Opaque => false,
        }
    }
}

/// A message as yielded by a history walk. Content is never retained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub reactions: Option<ReactionSummary>,
}

impl HistoryMessage {
    pub fn has_own_reaction(&self) -> bool {
        self.reactions
            .as_ref()
            .is_some_and(ReactionSummary::has_own_reaction)
    }
}
