//! Drives a cleanup run: select chats, then locate → delete → scrub each one.

use std::{fmt, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    audit::AuditLog,
    chunk::ChunkSize,
    client::MessagingClient,
    deletion::DeletionPipeline,
    domain::{Chat, ChatId},
    errors::Error,
    guard::RateLimitGuard,
    locator::{MessageLocator, PageSize},
    scrubber::{ReactionScrubber, ScrubReport, ScrubSettings},
    Result,
};

/// Shown when the platform answers with something no adapter recognizes.
pub const PLATFORM_CHANGED_HINT: &str =
    "Probably the platform API has changed, ask the developers to update this utility";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatSelector {
    /// Every group-like chat on the account.
    All,
    /// These chat ids, in this order.
    Ids(Vec<i64>),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupSettings {
    pub page_size: PageSize,
    pub chunk_size: ChunkSize,
    pub scrub: ScrubSettings,
    pub skip_reactions: bool,
    /// Locate and report only.
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Selecting,
    Locating,
    Deleting,
    Scrubbing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Selecting => "selecting",
            Phase::Locating => "locating",
            Phase::Deleting => "deleting",
            Phase::Scrubbing => "scrubbing",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReport {
    pub chat_id: ChatId,
    pub title: String,
    pub phase: Phase,
    pub found: usize,
    pub deleted: usize,
    pub scrub: Option<ScrubReport>,
}

impl ChatReport {
    fn new(chat: &Chat) -> Self {
        Self {
            chat_id: chat.id,
            title: chat.title.clone(),
            phase: Phase::Locating,
            found: 0,
            deleted: 0,
            scrub: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub selected: Vec<String>,
    pub chats: Vec<ChatReport>,
    pub backoffs: usize,
    pub total_wait: Duration,
}

impl RunReport {
    pub fn deleted(&self) -> usize {
        self.chats.iter().map(|c| c.deleted).sum()
    }

    pub fn reactions_removed(&self) -> usize {
        self.chats
            .iter()
            .filter_map(|c| c.scrub.as_ref())
            .map(|s| s.removed)
            .sum()
    }

    /// Chats that made it through every phase.
    pub fn completed(&self) -> usize {
        self.chats.iter().filter(|c| c.phase == Phase::Done).count()
    }
}

/// How a run ended. Partial progress is kept in every variant.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Interrupted(RunReport),
    Failed { report: RunReport, error: Error },
    PlatformChanged { report: RunReport, detail: String },
}

impl RunOutcome {
    pub fn report(&self) -> &RunReport {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Interrupted(r) => r,
            RunOutcome::Failed { report, .. } | RunOutcome::PlatformChanged { report, .. } => {
                report
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(_) => 0,
            RunOutcome::Failed { .. } => 1,
            RunOutcome::PlatformChanged { .. } => 2,
            RunOutcome::Interrupted(_) => 130,
        }
    }

    /// Terminal, user-facing diagnostic, if the run did not complete.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::Interrupted(r) => Some(format!(
                "Interrupted. {} chat(s) fully cleaned, {} message(s) deleted so far.",
                r.completed(),
                r.deleted()
            )),
            RunOutcome::Failed { error, .. } => Some(format!("Cleanup aborted: {error}")),
            RunOutcome::PlatformChanged { detail, .. } => Some(format!(
                "UnknownError occurred: {detail}\n{PLATFORM_CHANGED_HINT}"
            )),
        }
    }
}

/// Sequential cleanup engine over one messaging account.
pub struct Cleaner {
    client: Arc<dyn MessagingClient>,
    settings: CleanupSettings,
    guard: RateLimitGuard,
    audit: Option<Arc<AuditLog>>,
}

impl Cleaner {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        settings: CleanupSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            settings,
            guard: RateLimitGuard::new(cancel),
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Option<AuditLog>) -> Self {
        self.audit = audit.map(Arc::new);
        self.guard = self.guard.with_audit(self.audit.clone());
        self
    }

    pub fn settings(&self) -> &CleanupSettings {
        &self.settings
    }

    /// List the account's chats and resolve the selector against the
    /// group-like ones.
    pub async fn select(&self, selector: &ChatSelector) -> Result<Vec<Chat>> {
        let client = self.client.as_ref();
        let chats = self.guard.call("list_chats", || client.list_chats()).await?;
        let groups: Vec<Chat> = chats.into_iter().filter(|c| c.kind.is_group_like()).collect();

        match selector {
            ChatSelector::All => Ok(groups),
            ChatSelector::Ids(ids) => {
                let mut picked = Vec::with_capacity(ids.len());
                let mut missing = Vec::new();
                for id in ids {
                    match groups.iter().find(|c| c.id.0 == *id) {
                        Some(c) => picked.push(c.clone()),
                        None => missing.push(id.to_string()),
                    }
                }
                if !missing.is_empty() {
                    return Err(Error::Config(format!(
                        "selected chat(s) not found among your groups: {}",
                        missing.join(", ")
                    )));
                }
                Ok(picked)
            }
        }
    }

    /// Process `selection` strictly one chat after another.
    ///
    /// Per-chat progress lands in `report` as it happens, so a failing run
    /// still accounts for the work already done.
    pub async fn run(&self, selection: &[Chat], report: &mut RunReport) -> Result<()> {
        for chat in selection {
            report.chats.push(ChatReport::new(chat));
            let idx = report.chats.len() - 1;
            self.clean_chat(chat, &mut report.chats[idx]).await?;
        }
        Ok(())
    }

    async fn clean_chat(&self, chat: &Chat, out: &mut ChatReport) -> Result<()> {
        let client = self.client.as_ref();
        let audit = self.audit.as_deref();

        out.phase = Phase::Locating;
        let ids = MessageLocator::new(client, &self.guard, self.settings.page_size)
            .locate(chat)
            .await?;
        out.found = ids.len();

        if self.settings.dry_run {
            tracing::info!(chat = %chat.title, found = ids.len(), "dry run, leaving chat untouched");
            out.phase = Phase::Done;
            return Ok(());
        }

        out.phase = Phase::Deleting;
        out.deleted = DeletionPipeline::new(client, &self.guard, self.settings.chunk_size)
            .with_audit(audit)
            .delete(chat, &ids)
            .await?;

        if !self.settings.skip_reactions {
            out.phase = Phase::Scrubbing;
            let scrub = ReactionScrubber::new(client, &self.guard, self.settings.scrub)
                .with_audit(audit)
                .scrub(chat)
                .await?;
            out.scrub = Some(scrub);
        }

        out.phase = Phase::Done;
        Ok(())
    }

    /// Outermost boundary of a run: select, clean, classify the ending.
    pub async fn execute(&self, selector: &ChatSelector) -> RunOutcome {
        let mut report = RunReport::default();
        let result = self.execute_inner(selector, &mut report).await;
        report.backoffs = self.guard.backoffs();
        report.total_wait = self.guard.total_wait();
        log_report(&report);

        match result {
            Ok(()) => RunOutcome::Completed(report),
            Err(Error::Cancelled) => RunOutcome::Interrupted(report),
            Err(Error::Platform(detail)) => {
                tracing::error!("unrecognized platform error: {detail}");
                RunOutcome::PlatformChanged { report, detail }
            }
            Err(error) => {
                let phase = report
                    .chats
                    .last()
                    .map(|c| format!("{} \"{}\"", c.phase, c.title))
                    .unwrap_or_else(|| Phase::Selecting.to_string());
                tracing::error!(%phase, "cleanup aborted: {error}");
                RunOutcome::Failed { report, error }
            }
        }
    }

    async fn execute_inner(&self, selector: &ChatSelector, report: &mut RunReport) -> Result<()> {
        let selection = self.select(selector).await?;
        report.selected = selection.iter().map(|c| c.title.clone()).collect();
        if selection.is_empty() {
            tracing::warn!("no group chats selected, nothing to do");
            return Ok(());
        }
        tracing::info!("selected {}", report.selected.join(", "));
        self.run(&selection, report).await
    }
}

fn log_report(report: &RunReport) {
    for c in &report.chats {
        let (inspected, removed) = c
            .scrub
            .map(|s| (s.inspected, s.removed))
            .unwrap_or((0, 0));
        tracing::info!(
            chat = %c.title,
            phase = %c.phase,
            found = c.found,
            deleted = c.deleted,
            inspected,
            reactions_removed = removed,
            "chat summary"
        );
    }
    tracing::info!(
        chats = report.chats.len(),
        deleted = report.deleted(),
        reactions_removed = report.reactions_removed(),
        backoffs = report.backoffs,
        waited_secs = report.total_wait.as_secs(),
        "run summary"
    );
}
