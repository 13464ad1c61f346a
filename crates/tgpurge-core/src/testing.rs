//! Scripted in-memory messaging client for engine tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    client::MessagingClient,
    domain::{
        Chat, ChatId, ChatKind, HistoryMessage, MessageId, ReactionRecord, ReactionSummary,
    },
    errors::Error,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub(crate) enum Fault {
    RateLimited(u64),
    External,
    Platform,
}

impl Fault {
    fn into_error(self) -> Error {
        match self {
            Fault::RateLimited(secs) => Error::rate_limited_secs(secs),
            Fault::External => Error::External("scripted failure".to_string()),
            Fault::Platform => Error::Platform("UNKNOWN".to_string()),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeClient {
    chats: Vec<Chat>,
    own: HashMap<i64, Vec<MessageId>>,
    history: HashMap<i64, Vec<HistoryMessage>>,
    // Fixed history page length, ignoring the requested limit.
    history_page_len: Option<usize>,

    list_faults: Mutex<VecDeque<Fault>>,
    search_faults: Mutex<HashMap<i64, VecDeque<Fault>>>,
    delete_faults: Mutex<HashMap<i64, VecDeque<Fault>>>,
    reaction_faults: Mutex<HashMap<i32, Fault>>,

    search_calls: Mutex<Vec<(ChatId, usize, usize)>>,
    delete_calls: Mutex<Vec<(ChatId, Vec<MessageId>)>>,
    history_calls: Mutex<Vec<(ChatId, Option<MessageId>, usize)>>,
    reaction_calls: Mutex<Vec<(ChatId, MessageId, String)>>,
}

impl FakeClient {
    pub(crate) fn with_chats(mut self, chats: Vec<Chat>) -> Self {
        self.chats = chats;
        self
    }

    /// `count` own messages with ids `count..=1`, newest first.
    pub(crate) fn with_own_messages(mut self, chat_id: i64, count: i32) -> Self {
        self.own
            .insert(chat_id, (1..=count).rev().map(MessageId).collect());
        self
    }

    pub(crate) fn with_history(mut self, chat_id: i64, history: Vec<HistoryMessage>) -> Self {
        self.history.insert(chat_id, history);
        self
    }

    /// Answer every history request with `len` rows, whatever was asked for.
    pub(crate) fn with_history_page_len(mut self, len: usize) -> Self {
        self.history_page_len = Some(len);
        self
    }

    pub(crate) fn fail_list(self, fault: Fault) -> Self {
        self.list_faults.lock().unwrap().push_back(fault);
        self
    }

    pub(crate) fn fail_search(self, chat_id: i64, fault: Fault) -> Self {
        self.search_faults
            .lock()
            .unwrap()
            .entry(chat_id)
            .or_default()
            .push_back(fault);
        self
    }

    pub(crate) fn fail_delete(self, chat_id: i64, fault: Fault) -> Self {
        self.delete_faults
            .lock()
            .unwrap()
            .entry(chat_id)
            .or_default()
            .push_back(fault);
        self
    }

    pub(crate) fn fail_reaction(self, message_id: i32, fault: Fault) -> Self {
        self.reaction_faults
            .lock()
            .unwrap()
            .insert(message_id, fault);
        self
    }

    pub(crate) fn search_calls(&self) -> Vec<(ChatId, usize, usize)> {
        self.search_calls.lock().unwrap().clone()
    }

    pub(crate) fn delete_calls(&self) -> Vec<(ChatId, Vec<MessageId>)> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub(crate) fn history_calls(&self) -> Vec<(ChatId, Option<MessageId>, usize)> {
        self.history_calls.lock().unwrap().clone()
    }

    pub(crate) fn reaction_calls(&self) -> Vec<(ChatId, MessageId, String)> {
        self.reaction_calls.lock().unwrap().clone()
    }
}

fn pop_fault(map: &Mutex<HashMap<i64, VecDeque<Fault>>>, chat_id: ChatId) -> Option<Fault> {
    map.lock()
        .unwrap()
        .get_mut(&chat_id.0)
        .and_then(VecDeque::pop_front)
}

#[async_trait]
impl MessagingClient for FakeClient {
    async fn list_chats(&self) -> Result<Vec<Chat>> {
        if let Some(f) = self.list_faults.lock().unwrap().pop_front() {
            return Err(f.into_error());
        }
        Ok(self.chats.clone())
    }

    async fn search_own_messages(
        &self,
        chat_id: ChatId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MessageId>> {
        self.search_calls
            .lock()
            .unwrap()
            .push((chat_id, offset, limit));
        if let Some(f) = pop_fault(&self.search_faults, chat_id) {
            return Err(f.into_error());
        }
        let own = self.own.get(&chat_id.0).cloned().unwrap_or_default();
        Ok(own.into_iter().skip(offset).take(limit).collect())
    }

    async fn delete_messages(&self, chat_id: ChatId, ids: &[MessageId]) -> Result<()> {
        self.delete_calls
            .lock()
            .unwrap()
            .push((chat_id, ids.to_vec()));
        if let Some(f) = pop_fault(&self.delete_faults, chat_id) {
            return Err(f.into_error());
        }
        Ok(())
    }

    async fn history_page(
        &self,
        chat_id: ChatId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>> {
        self.history_calls
            .lock()
            .unwrap()
            .push((chat_id, before, limit));
        let all = self.history.get(&chat_id.0).cloned().unwrap_or_default();
        Ok(all
            .into_iter()
            .filter(|m| before.map_or(true, |b| m.id < b))
            .take(self.history_page_len.unwrap_or(limit))
            .collect())
    }

    async fn set_reaction(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<()> {
        self.reaction_calls
            .lock()
            .unwrap()
            .push((chat_id, message_id, emoji.to_string()));
        if let Some(f) = self.reaction_faults.lock().unwrap().remove(&message_id.0) {
            return Err(f.into_error());
        }
        Ok(())
    }
}

pub(crate) fn group(id: i64, title: &str) -> Chat {
    Chat::new(id, title, ChatKind::Supergroup)
}

/// History of `count` messages, newest first, ids `count..=1`.
/// `mine(id)` decides which ones carry the current user's reaction.
pub(crate) fn history(count: i32, mine: impl Fn(i32) -> bool) -> Vec<HistoryMessage> {
    (1..=count)
        .rev()
        .map(|id| HistoryMessage {
            id: MessageId(id),
            reactions: Some(ReactionSummary::Records(vec![ReactionRecord {
                emoji: Some("👍".to_string()),
                count: 2,
                chosen_order: mine(id).then_some(0),
            }])),
        })
        .collect()
}
