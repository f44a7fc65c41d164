use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::claims::domain::{ResponseId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Message persisted in the channel of an accepted response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub response_id: ResponseId,
    pub sender: UserId,
    pub content: String,
    pub read_by: BTreeSet<UserId>,
    pub created_at: DateTime<Utc>,
    /// Store-wide insertion order; breaks ties between identical timestamps.
    pub sequence: u64,
}

impl ChatMessage {
    pub fn is_read_by(&self, user: &UserId) -> bool {
        self.read_by.contains(user)
    }
}

/// Message as handed to storage, before an id and sequence are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub response_id: ResponseId,
    pub sender: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The two participants of a channel, fixed when the response was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelMembers {
    pub owner: UserId,
    pub responder: UserId,
}

impl ChannelMembers {
    pub fn contains(&self, user: &UserId) -> bool {
        &self.owner == user || &self.responder == user
    }
}

/// Channel state returned when a member opens the chat.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub response_id: ResponseId,
    pub members: ChannelMembers,
    pub messages: Vec<ChatMessage>,
}

/// Body of a posted message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDraft {
    pub content: String,
}
