//! HTTP bridge adapter.
//!
//! Implements the `tgpurge-core` [`MessagingClient`] over a JSON bridge that
//! fronts an already-authenticated user session and answers with
//! Telegram-style envelopes (`ok`, `result`, `error_code`, `description`,
//! `parameters.retry_after`).

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub mod dto;
pub mod envelope;

use tgpurge_core::{
    client::MessagingClient,
    domain::{Chat, ChatId, HistoryMessage, MessageId},
    errors::Error,
    Result,
};

use crate::dto::{ChatDto, MessageDto};

#[derive(Clone, Debug)]
pub struct BridgeClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl BridgeClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            token,
            http,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn invoke<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T> {
        let mut req = self.http.post(self.url(method)).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::External(format!("{method} request error: {e}")))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::External(format!("{method} read error: {e}")))?;

        tracing::trace!(method, status, "bridge response");
        envelope::decode(method, status, &text)
    }
}

/// Request body for a reaction update; an empty emoji clears the reaction.
fn reaction_body(chat_id: ChatId, message_id: MessageId, emoji: &str) -> Value {
    let reaction = if emoji.is_empty() {
        json!([])
    } else {
        json!([{ "type": "emoji", "emoji": emoji }])
    };
    json!({
        "chat_id": chat_id.0,
        "message_id": message_id.0,
        "reaction": reaction,
    })
}

#[async_trait]
impl MessagingClient for BridgeClient {
    async fn list_chats(&self) -> Result<Vec<Chat>> {
        let chats: Vec<ChatDto> = self.invoke("getChats", json!({})).await?;
        Ok(chats.into_iter().map(Chat::from).collect())
    }

    async fn search_own_messages(
        &self,
        chat_id: ChatId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MessageId>> {
        let msgs: Vec<MessageDto> = self
            .invoke(
                "searchMessages",
                json!({
                    "chat_id": chat_id.0,
                    "from_user": "me",
                    "query": "",
                    "offset": offset,
                    "limit": limit,
                }),
            )
            .await?;
        Ok(msgs.iter().map(MessageDto::id).collect())
    }

    async fn delete_messages(&self, chat_id: ChatId, ids: &[MessageId]) -> Result<()> {
        let ids: Vec<i32> = ids.iter().map(|m| m.0).collect();
        let _: Value = self
            .invoke(
                "deleteMessages",
                json!({ "chat_id": chat_id.0, "message_ids": ids, "revoke": true }),
            )
            .await?;
        Ok(())
    }

    async fn history_page(
        &self,
        chat_id: ChatId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>> {
        let msgs: Vec<MessageDto> = self
            .invoke(
                "getChatHistory",
                json!({
                    "chat_id": chat_id.0,
                    "offset_id": before.map_or(0, |m| m.0),
                    "limit": limit,
                }),
            )
            .await?;
        Ok(msgs.into_iter().map(MessageDto::into_history).collect())
    }

    async fn set_reaction(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<()> {
        let _: Value = self
            .invoke("setMessageReaction", reaction_body(chat_id, message_id, emoji))
            .await?;
        Ok(())
    }
}
