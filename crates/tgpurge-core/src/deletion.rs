use crate::{
    audit::{self, AuditEvent, AuditLog},
    chunk::{chunks, ChunkSize},
    client::MessagingClient,
    domain::{Chat, MessageId},
    guard::RateLimitGuard,
    Result,
};

/// Removes a chat's discovered messages in fixed-size delete calls.
pub struct DeletionPipeline<'a> {
    client: &'a dyn MessagingClient,
    guard: &'a RateLimitGuard,
    chunk_size: ChunkSize,
    audit: Option<&'a AuditLog>,
}

impl<'a> DeletionPipeline<'a> {
    pub fn new(
        client: &'a dyn MessagingClient,
        guard: &'a RateLimitGuard,
        chunk_size: ChunkSize,
    ) -> Self {
        Self {
            client,
            guard,
            chunk_size,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Option<&'a AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    /// Delete `ids` in discovery order, one call per chunk.
    ///
    /// A rate-limited chunk is re-sent whole until it goes through. Any other
    /// failure is returned and the remaining chunks are not attempted.
    pub async fn delete(&self, chat: &Chat, ids: &[MessageId]) -> Result<usize> {
        let listed = ids
            .iter()
            .map(|m| m.0.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(
            chat = %chat.title,
            count = ids.len(),
            "deleting {} messages with message ids: [{listed}]",
            ids.len()
        );
        audit::record(self.audit, || AuditEvent::deletion_planned(chat, ids));

        let mut deleted = 0usize;
        for chunk in chunks(ids, self.chunk_size) {
            self.guard
                .call("delete", || self.client.delete_messages(chat.id, chunk))
                .await?;
            deleted += chunk.len();
            tracing::debug!(chat = %chat.title, deleted, total = ids.len(), "chunk deleted");
            audit::record(self.audit, || AuditEvent::chunk_deleted(chat, chunk));
        }
        Ok(deleted)
    }
}
