use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    domain::{Chat, MessageId},
    Result,
};

/// RFC3339 timestamp in UTC.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// One line of the JSON-lines audit file.
///
/// The `deletion_planned` record carries the full id list of a chat before any
/// delete call goes out, so an interrupted run can be reconciled by hand.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_ids: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn blank(event: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            chat_id: None,
            chat_title: None,
            message_ids: None,
            message_id: None,
            call: None,
            retry_after: None,
            error: None,
        }
    }

    fn for_chat(event: &str, chat: &Chat) -> Self {
        Self {
            chat_id: Some(chat.id.0),
            chat_title: Some(chat.title.clone()),
            ..Self::blank(event)
        }
    }

    pub fn deletion_planned(chat: &Chat, ids: &[MessageId]) -> Self {
        Self {
            message_ids: Some(ids.iter().map(|m| m.0).collect()),
            ..Self::for_chat("deletion_planned", chat)
        }
    }

    pub fn chunk_deleted(chat: &Chat, ids: &[MessageId]) -> Self {
        Self {
            message_ids: Some(ids.iter().map(|m| m.0).collect()),
            ..Self::for_chat("chunk_deleted", chat)
        }
    }

    pub fn reaction_removed(chat: &Chat, message_id: MessageId) -> Self {
        Self {
            message_id: Some(message_id.0),
            ..Self::for_chat("reaction_removed", chat)
        }
    }

    pub fn reaction_failed(chat: &Chat, message_id: MessageId, error: &str) -> Self {
        Self {
            message_id: Some(message_id.0),
            error: Some(error.to_string()),
            ..Self::for_chat("reaction_failed", chat)
        }
    }

    pub fn rate_limit(call: &str, wait: Duration) -> Self {
        Self {
            call: Some(call.to_string()),
            retry_after: Some(wait.as_secs_f64()),
            ..Self::blank("rate_limit")
        }
    }
}

/// Append-only JSON-lines audit file.
#[derive(Clone, Debug)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Audit failures never stop a cleanup run; they are logged and dropped.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(&event) {
            tracing::warn!(path = %self.path.display(), event = %event.event, "audit write failed: {e}");
        }
    }
}

/// Convenience for optional audit sinks.
pub(crate) fn record(audit: Option<&AuditLog>, event: impl FnOnce() -> AuditEvent) {
    if let Some(log) = audit {
        log.record(event());
    }
}
