//! Conversation list, message thread, and composer.

use std::collections::HashMap;

use fly8_core::models::{Conversation, Message};
use fly8_core::pagination::Paginated;
use fly8_core::time_ago::format_time_ago;
use fly8_core::types::{EntityId, Timestamp};
use serde_json::Value;

use crate::error::SyncError;
use crate::mutations::Mutations;

// ---------------------------------------------------------------------------
// Conversation list
// ---------------------------------------------------------------------------

/// One rendered line of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    pub conversation_id: EntityId,
    pub name: String,
    pub preview: String,
    pub time_ago: String,
    pub unread: u32,
    pub selected: bool,
}

/// Conversations ordered by last activity, newest first, with a sticky
/// selection.
///
/// The first conversation is auto-selected when the selection is empty
/// and the list becomes non-empty. Re-ordering never moves an existing
/// selection.
#[derive(Debug, Default)]
pub struct ConversationList {
    conversations: Vec<Conversation>,
    selected: Option<EntityId>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive from a conversations payload (bare array or
    /// `{ "conversations": [...] }`). Returns `true` when this call
    /// auto-selected a conversation.
    pub fn apply(&mut self, data: &Value) -> Result<bool, serde_json::Error> {
        let page: Paginated<Conversation> = Paginated::from_value(data, "conversations")?;

        // Keep the most recent copy of each conversation.
        let mut by_id: HashMap<EntityId, Conversation> = HashMap::new();
        for conversation in page.items {
            match by_id.get(&conversation.conversation_id) {
                Some(existing) if existing.last_activity() >= conversation.last_activity() => {}
                _ => {
                    by_id.insert(conversation.conversation_id.clone(), conversation);
                }
            }
        }

        let mut conversations: Vec<Conversation> = by_id.into_values().collect();
        conversations.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.conversation_id.cmp(&b.conversation_id))
        });
        self.conversations = conversations;

        if self.selected.is_none() {
            if let Some(first) = self.conversations.first() {
                self.selected = Some(first.conversation_id.clone());
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        let selected = self.selected.as_deref()?;
        self.conversations
            .iter()
            .find(|c| c.conversation_id == selected)
    }

    pub fn select(&mut self, conversation_id: impl Into<EntityId>) {
        self.selected = Some(conversation_id.into());
    }

    /// Clear the selection. The next non-empty `apply` auto-selects again.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Sum of server-reported unread counts.
    pub fn total_unread(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    /// Rows for display, with time-ago labels relative to `now`.
    pub fn rows(&self, now: Timestamp) -> Vec<ConversationRow> {
        self.conversations
            .iter()
            .map(|c| ConversationRow {
                conversation_id: c.conversation_id.clone(),
                name: c.counterpart.display_name(),
                preview: c
                    .last_message
                    .as_ref()
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
                time_ago: c
                    .last_activity()
                    .map(|ts| format_time_ago(now, ts))
                    .unwrap_or_default(),
                unread: c.unread_count,
                selected: self.selected.as_deref() == Some(c.conversation_id.as_str()),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Message thread
// ---------------------------------------------------------------------------

/// Messages of one conversation in chronological order.
#[derive(Debug)]
pub struct MessageThread {
    conversation_id: EntityId,
    messages: Vec<Message>,
    scroll_to_bottom: bool,
}

impl MessageThread {
    pub fn new(conversation_id: impl Into<EntityId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            scroll_to_bottom: false,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Re-derive from a thread payload. Messages are de-duplicated by id
    /// and sorted by `created_at`, ties broken by id. Messages from other
    /// conversations are ignored.
    ///
    /// Returns `true` when the newest message changed, which also raises
    /// the scroll-to-bottom signal.
    pub fn apply(&mut self, data: &Value) -> Result<bool, serde_json::Error> {
        let page: Paginated<Message> = Paginated::from_value(data, "messages")?;

        let mut by_id: HashMap<EntityId, Message> = HashMap::new();
        for message in page.items {
            if message.conversation_id == self.conversation_id {
                by_id.insert(message.id.clone(), message);
            }
        }

        let mut messages: Vec<Message> = by_id.into_values().collect();
        messages.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let previous_last = self.messages.last().map(|m| m.id.clone());
        let grew = messages.last().map(|m| &m.id) != previous_last.as_ref();
        self.messages = messages;

        if grew {
            self.scroll_to_bottom = true;
        }
        Ok(grew)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Take the pending scroll-to-bottom signal.
    pub fn take_scroll_signal(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_bottom)
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Draft input for one conversation.
///
/// Sending clears the draft immediately; the sent message appears only
/// after the thread is refetched. On failure the draft is restored unless
/// the user has typed something new.
#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Whether the draft has sendable content.
    pub fn can_send(&self) -> bool {
        !self.draft.trim().is_empty()
    }

    /// Send the draft to `student_id`.
    ///
    /// Returns `Ok(None)` without a request when the draft is blank.
    pub async fn send(
        &mut self,
        mutations: &Mutations,
        student_id: &str,
    ) -> Result<Option<Value>, SyncError> {
        if !self.can_send() {
            return Ok(None);
        }

        let content = std::mem::take(&mut self.draft);
        match mutations.send_message(student_id, &content).await {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                tracing::warn!(student_id, error = %e, "Failed to send message");
                if self.draft.is_empty() {
                    self.draft = content;
                }
                Err(e)
            }
        }
    }
}
