use std::{collections::VecDeque, time::Duration};

use crate::{
    audit::{self, AuditEvent, AuditLog},
    client::MessagingClient,
    domain::{Chat, HistoryMessage, MessageId},
    errors::Error,
    guard::RateLimitGuard,
    Result,
};

/// History messages fetched per page during a scrub.
pub const HISTORY_PAGE: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrubSettings {
    /// Most messages inspected per chat.
    pub scan_cap: usize,
    /// Pause after every inspected message.
    pub inspect_pause: Duration,
    /// Extra pause after a successful reaction removal.
    pub reaction_pause: Duration,
}

impl Default for ScrubSettings {
    fn default() -> Self {
        Self {
            scan_cap: 1000,
            inspect_pause: Duration::from_millis(100),
            reaction_pause: Duration::from_millis(50),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrubReport {
    pub inspected: usize,
    pub removed: usize,
    /// Removals skipped because the platform asked us to back off.
    pub rate_limited: usize,
    pub failed: usize,
    /// The walk ended at the scan cap rather than the start of the chat.
    pub capped: bool,
}

/// Lazy, newest-first walk over a chat's history, page by page.
///
/// Never requests more than `remaining` messages in total.
pub struct HistoryWalker<'a> {
    client: &'a dyn MessagingClient,
    guard: &'a RateLimitGuard,
    chat: &'a Chat,
    buffer: VecDeque<HistoryMessage>,
    before: Option<MessageId>,
    remaining: usize,
    exhausted: bool,
}

impl<'a> HistoryWalker<'a> {
    pub fn new(
        client: &'a dyn MessagingClient,
        guard: &'a RateLimitGuard,
        chat: &'a Chat,
        limit: usize,
    ) -> Self {
        Self {
            client,
            guard,
            chat,
            buffer: VecDeque::new(),
            before: None,
            remaining: limit,
            exhausted: limit == 0,
        }
    }

    pub async fn next(&mut self) -> Result<Option<HistoryMessage>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }
        let Some(msg) = self.buffer.pop_front() else {
            return Ok(None);
        };
        self.remaining -= 1;
        Ok(Some(msg))
    }

    async fn fill(&mut self) -> Result<()> {
        let want = self.remaining.min(HISTORY_PAGE);
        let before = self.before;
        let mut page = self
            .guard
            .call("history", || {
                self.client.history_page(self.chat.id, before, want)
            })
            .await?;

        if page.is_empty() {
            self.exhausted = true;
            return Ok(());
        }
        // Adapters may ignore the limit. The cursor must follow the last
        // message we keep, or the surplus rows are never walked.
        page.truncate(want);
        self.before = page.last().map(|m| m.id);
        self.buffer.extend(page);
        if self.remaining <= self.buffer.len() {
            self.exhausted = true;
        }
        Ok(())
    }
}

/// Retracts the current user's reactions across a chat's recent history.
pub struct ReactionScrubber<'a> {
    client: &'a dyn MessagingClient,
    guard: &'a RateLimitGuard,
    settings: ScrubSettings,
    audit: Option<&'a AuditLog>,
}

impl<'a> ReactionScrubber<'a> {
    pub fn new(
        client: &'a dyn MessagingClient,
        guard: &'a RateLimitGuard,
        settings: ScrubSettings,
    ) -> Self {
        Self {
            client,
            guard,
            settings,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Option<&'a AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    /// Best-effort pass over at most `scan_cap` messages.
    ///
    /// Per-message failures are logged and skipped; a rate-limited removal is
    /// slept out but not retried. A failing history fetch ends the pass early.
    /// Only cancellation is returned as an error.
    pub async fn scrub(&self, chat: &Chat) -> Result<ScrubReport> {
        tracing::info!(chat = %chat.title, chat_id = %chat.id, "removing my reactions");
        let mut report = ScrubReport::default();
        let mut walker = HistoryWalker::new(self.client, self.guard, chat, self.settings.scan_cap);

        loop {
            let msg = match walker.next().await {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::warn!(chat = %chat.title, "history walk failed, ending scrub: {e}");
                    break;
                }
            };
            report.inspected += 1;

            if msg.has_own_reaction() {
                self.retract(chat, msg.id, &mut report).await?;
            }
            self.guard.pause(self.settings.inspect_pause).await?;
        }

        if self.settings.scan_cap > 0 && report.inspected >= self.settings.scan_cap {
            report.capped = true;
            tracing::info!(
                chat = %chat.title,
                "reached limit {} msg in chat, stopping",
                self.settings.scan_cap
            );
        }
        tracing::info!(
            chat = %chat.title,
            inspected = report.inspected,
            removed = report.removed,
            rate_limited = report.rate_limited,
            failed = report.failed,
            "reaction scrub finished"
        );
        Ok(report)
    }

    async fn retract(&self, chat: &Chat, id: MessageId, report: &mut ScrubReport) -> Result<()> {
        if self.guard.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.client.set_reaction(chat.id, id, "").await {
            Ok(()) => {
                report.removed += 1;
                tracing::info!(chat = %chat.title, message_id = %id, "removed reaction from msg {id}");
                audit::record(self.audit, || AuditEvent::reaction_removed(chat, id));
                self.guard.pause(self.settings.reaction_pause).await
            }
            Err(Error::RateLimited { wait }) => {
                report.rate_limited += 1;
                self.guard.backoff("reaction", wait).await
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(chat = %chat.title, message_id = %id, "reaction removal failed: {e}");
                audit::record(self.audit, || {
                    AuditEvent::reaction_failed(chat, id, &e.to_string())
                });
                Ok(())
            }
        }
    }
}
