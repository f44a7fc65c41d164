//! Process-local storage backends.
//!
//! Each repository keeps its records behind a single mutex, which makes every trait method
//! atomic. That is what the response compare-and-set relies on.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::warn;

use crate::chat::domain::{ChatMessage, MessageId, NewMessage};
use crate::chat::repository::MessageRepository;
use crate::notifications::{DeliveryError, Envelope, NotificationTransport};
use crate::workflows::claims::domain::{
    Item, ItemId, ItemResponse, ItemStatus, ResponseId, ResponseStatus, UserId,
};
use crate::workflows::claims::repository::{
    ItemRepository, RepositoryError, ResponseRepository, TransitionOutcome,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} mutex poisoned")))
}

#[derive(Default, Clone)]
pub struct MemoryItemRepository {
    items: Arc<Mutex<Vec<Item>>>,
}

impl ItemRepository for MemoryItemRepository {
    fn insert(&self, item: Item) -> Result<Item, RepositoryError> {
        let mut guard = lock(&self.items, "item")?;
        if guard.iter().any(|existing| existing.id == item.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(item.clone());
        Ok(item)
    }

    fn fetch(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        let guard = lock(&self.items, "item")?;
        Ok(guard.iter().find(|item| &item.id == id).cloned())
    }

    fn owned_by(&self, owner: &UserId) -> Result<Vec<Item>, RepositoryError> {
        let guard = lock(&self.items, "item")?;
        Ok(guard
            .iter()
            .filter(|item| &item.owner == owner)
            .cloned()
            .collect())
    }

    fn mark_resolved(&self, id: &ItemId) -> Result<bool, RepositoryError> {
        let mut guard = lock(&self.items, "item")?;
        let item = guard
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if item.status == ItemStatus::Resolved {
            return Ok(false);
        }
        item.status = ItemStatus::Resolved;
        item.updated_at = Utc::now();
        Ok(true)
    }
}

/// Responses in submission order.
#[derive(Default, Clone)]
pub struct MemoryResponseRepository {
    records: Arc<Mutex<Vec<ItemResponse>>>,
}

impl ResponseRepository for MemoryResponseRepository {
    fn insert(&self, record: ItemResponse) -> Result<ItemResponse, RepositoryError> {
        let mut guard = lock(&self.records, "response")?;
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ResponseId) -> Result<Option<ItemResponse>, RepositoryError> {
        let guard = lock(&self.records, "response")?;
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn for_item(&self, item_id: &ItemId) -> Result<Vec<ItemResponse>, RepositoryError> {
        let guard = lock(&self.records, "response")?;
        Ok(guard
            .iter()
            .filter(|record| &record.item_id == item_id)
            .cloned()
            .collect())
    }

    fn for_responder(&self, responder: &UserId) -> Result<Vec<ItemResponse>, RepositoryError> {
        let guard = lock(&self.records, "response")?;
        Ok(guard
            .iter()
            .rev()
            .filter(|record| &record.responder == responder)
            .cloned()
            .collect())
    }

    fn transition(
        &self,
        id: &ResponseId,
        expected: ResponseStatus,
        next: ResponseStatus,
    ) -> Result<TransitionOutcome, RepositoryError> {
        let mut guard = lock(&self.records, "response")?;
        let index = guard
            .iter()
            .position(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;

        let current = &guard[index];
        if current.status != expected {
            return Ok(TransitionOutcome::Stale(current.clone()));
        }
        if next == ResponseStatus::Accepted {
            let sibling_accepted = guard.iter().any(|other| {
                other.item_id == current.item_id
                    && other.id != current.id
                    && other.status == ResponseStatus::Accepted
            });
            if sibling_accepted {
                return Ok(TransitionOutcome::Stale(current.clone()));
            }
        }

        let record = &mut guard[index];
        record.status = next;
        record.updated_at = Utc::now();
        Ok(TransitionOutcome::Applied(record.clone()))
    }

    fn claim_notification(&self, id: &ResponseId) -> Result<bool, RepositoryError> {
        let mut guard = lock(&self.records, "response")?;
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if record.status != ResponseStatus::Accepted || record.notified_at.is_some() {
            return Ok(false);
        }
        record.notified_at = Some(Utc::now());
        Ok(true)
    }

    fn reject_pending(
        &self,
        item_id: &ItemId,
        except: &ResponseId,
    ) -> Result<usize, RepositoryError> {
        let mut guard = lock(&self.records, "response")?;
        let now = Utc::now();
        let mut rejected = 0;
        for record in guard.iter_mut().filter(|record| {
            &record.item_id == item_id
                && &record.id != except
                && record.status == ResponseStatus::Pending
        }) {
            record.status = ResponseStatus::Rejected;
            record.updated_at = now;
            rejected += 1;
        }
        Ok(rejected)
    }
}

#[derive(Default)]
struct MessageLog {
    next_sequence: u64,
    messages: Vec<ChatMessage>,
}

#[derive(Default, Clone)]
pub struct MemoryMessageRepository {
    log: Arc<Mutex<MessageLog>>,
}

impl MessageRepository for MemoryMessageRepository {
    fn append(&self, message: NewMessage) -> Result<ChatMessage, RepositoryError> {
        let mut guard = lock(&self.log, "message")?;
        guard.next_sequence += 1;
        let sequence = guard.next_sequence;

        let stored = ChatMessage {
            id: MessageId(format!("msg-{sequence:06}")),
            response_id: message.response_id,
            read_by: [message.sender.clone()].into_iter().collect(),
            sender: message.sender,
            content: message.content,
            created_at: message.created_at,
            sequence,
        };
        guard.messages.push(stored.clone());
        Ok(stored)
    }

    fn list(&self, channel: &ResponseId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let guard = lock(&self.log, "message")?;
        let mut messages: Vec<ChatMessage> = guard
            .messages
            .iter()
            .filter(|message| &message.response_id == channel)
            .cloned()
            .collect();
        messages.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.sequence.cmp(&b.sequence))
        });
        Ok(messages)
    }

    fn mark_read(&self, channel: &ResponseId, reader: &UserId) -> Result<usize, RepositoryError> {
        let mut guard = lock(&self.log, "message")?;
        let mut updated = 0;
        for message in guard
            .messages
            .iter_mut()
            .filter(|message| &message.response_id == channel)
        {
            if message.read_by.insert(reader.clone()) {
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn count_unread(
        &self,
        reader: &UserId,
        channels: &[ResponseId],
    ) -> Result<usize, RepositoryError> {
        let guard = lock(&self.log, "message")?;
        Ok(guard
            .messages
            .iter()
            .filter(|message| channels.contains(&message.response_id))
            .filter(|message| !message.is_read_by(reader))
            .count())
    }
}

#[derive(Default)]
struct OutboxState {
    envelopes: VecDeque<Envelope>,
    delivered: usize,
}

/// Transport that keeps envelopes in memory instead of sending them.
///
/// A relay drains it with [`MemoryOutbox::drain`]. A bounded outbox evicts the oldest
/// envelope once full.
#[derive(Default, Clone)]
pub struct MemoryOutbox {
    state: Arc<Mutex<OutboxState>>,
    capacity: Option<usize>,
}

impl MemoryOutbox {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            state: Arc::default(),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Envelopes waiting in the outbox, oldest first.
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.state
            .lock()
            .map(|guard| guard.envelopes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Hand every waiting envelope to the caller and empty the outbox.
    pub fn drain(&self) -> Vec<Envelope> {
        self.state
            .lock()
            .map(|mut guard| guard.envelopes.drain(..).collect())
            .unwrap_or_default()
    }
}

impl NotificationTransport for MemoryOutbox {
    fn deliver(&self, envelope: &Envelope) -> Result<String, DeliveryError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| DeliveryError::Transport("outbox mutex poisoned".to_string()))?;
        if let Some(capacity) = self.capacity {
            while guard.envelopes.len() >= capacity {
                if let Some(evicted) = guard.envelopes.pop_front() {
                    warn!(
                        recipient = %evicted.recipient.0,
                        kind = evicted.kind.label(),
                        "outbox full, oldest envelope dropped"
                    );
                }
            }
        }
        guard.envelopes.push_back(envelope.clone());
        guard.delivered += 1;
        Ok(format!("outbox#{}", guard.delivered))
    }
}
