use async_trait::async_trait;

use crate::{
    domain::{Chat, ChatId, HistoryMessage, MessageId},
    Result,
};

/// Port to the connected, authenticated messaging account.
///
/// Session bootstrap and transport are the adapter's business. Every call may
/// fail with [`crate::Error::RateLimited`], [`crate::Error::Platform`] or a
/// generic [`crate::Error::External`].
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Dialog roster of the account.
    async fn list_chats(&self) -> Result<Vec<Chat>>;

    /// Author-scoped search (author = current user, no content filter).
    async fn search_own_messages(
        &self,
        chat_id: ChatId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MessageId>>;

    async fn delete_messages(&self, chat_id: ChatId, ids: &[MessageId]) -> Result<()>;

    /// One page of history, newest first, strictly older than `before` when set.
    /// An empty page means the start of the chat was reached.
    async fn history_page(
        &self,
        chat_id: ChatId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>>;

    /// Set the current user's reaction; an empty `emoji` retracts it.
    async fn set_reaction(&self, chat_id: ChatId, message_id: MessageId, emoji: &str)
        -> Result<()>;
}
