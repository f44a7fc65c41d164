use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{ChannelMembers, ChannelSnapshot, ChatMessage, NewMessage};
use super::guard::{ChatAccessGuard, ResponseContext};
use super::registry::{ChannelSubscriberRegistry, ChannelSubscription};
use super::repository::MessageRepository;
use crate::workflows::claims::domain::{ResponseId, ResponseStatus, UserId};
use crate::workflows::claims::repository::{ItemRepository, ResponseRepository};
use crate::workflows::WorkflowError;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Per-response chat between the item owner and the accepted responder.
///
/// Every read and write passes the [`ChatAccessGuard`]. Messages are persisted before they
/// are published, so history fetched after a broadcast always contains it.
pub struct ChatChannel<I, R, M> {
    items: Arc<I>,
    responses: Arc<R>,
    messages: Arc<M>,
    registry: Arc<ChannelSubscriberRegistry>,
    guard: ChatAccessGuard,
    clock: Clock,
}

impl<I, R, M> ChatChannel<I, R, M>
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
{
    pub fn new(
        items: Arc<I>,
        responses: Arc<R>,
        messages: Arc<M>,
        registry: Arc<ChannelSubscriberRegistry>,
    ) -> Self {
        Self {
            items,
            responses,
            messages,
            registry,
            guard: ChatAccessGuard,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the timestamp source for new messages.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Guard check plus the channel history for a joining member.
    pub fn open_channel(
        &self,
        response_id: &ResponseId,
        user: &UserId,
    ) -> Result<ChannelSnapshot, WorkflowError> {
        let members = self.admit(response_id, user)?;
        let messages = self.messages.list(response_id)?;
        Ok(ChannelSnapshot {
            response_id: response_id.clone(),
            members,
            messages,
        })
    }

    pub fn list_messages(
        &self,
        response_id: &ResponseId,
        user: &UserId,
    ) -> Result<Vec<ChatMessage>, WorkflowError> {
        self.admit(response_id, user)?;
        Ok(self.messages.list(response_id)?)
    }

    pub fn post_message(
        &self,
        response_id: &ResponseId,
        sender: &UserId,
        content: &str,
    ) -> Result<ChatMessage, WorkflowError> {
        if content.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "message content must not be empty".to_string(),
            ));
        }
        self.admit(response_id, sender)?;

        let message = self.messages.append(NewMessage {
            response_id: response_id.clone(),
            sender: sender.clone(),
            content: content.to_string(),
            created_at: (self.clock)(),
        })?;

        let delivered = self.registry.publish(&message);
        debug!(
            response_id = %response_id.0,
            message_id = %message.id.0,
            delivered,
            "chat message posted"
        );
        Ok(message)
    }

    /// Mark every message in the channel as read by `user`. Safe to repeat.
    pub fn mark_read(
        &self,
        response_id: &ResponseId,
        user: &UserId,
    ) -> Result<usize, WorkflowError> {
        self.admit(response_id, user)?;
        Ok(self.messages.mark_read(response_id, user)?)
    }

    /// Unread messages across the channels `user` is a member of.
    pub fn unread_count(&self, user: &UserId) -> Result<usize, WorkflowError> {
        let channels = self.member_channels(user)?;
        if channels.is_empty() {
            return Ok(0);
        }
        Ok(self.messages.count_unread(user, &channels)?)
    }

    /// Join the live feed of a channel. The subscription leaves when dropped.
    pub fn subscribe(
        &self,
        response_id: &ResponseId,
        user: &UserId,
    ) -> Result<ChannelSubscription, WorkflowError> {
        self.admit(response_id, user)?;
        info!(response_id = %response_id.0, user = %user.0, "chat subscription opened");
        Ok(self.registry.subscribe(response_id))
    }

    fn admit(
        &self,
        response_id: &ResponseId,
        user: &UserId,
    ) -> Result<ChannelMembers, WorkflowError> {
        let context = self.context(response_id)?;
        self.guard.admit(user, context.as_ref())
    }

    fn context(&self, response_id: &ResponseId) -> Result<Option<ResponseContext>, WorkflowError> {
        let Some(response) = self.responses.fetch(response_id)? else {
            return Ok(None);
        };
        let Some(item) = self.items.fetch(&response.item_id)? else {
            return Ok(None);
        };
        Ok(Some(ResponseContext {
            response,
            owner: item.owner,
        }))
    }

    fn member_channels(&self, user: &UserId) -> Result<Vec<ResponseId>, WorkflowError> {
        let mut seen = HashSet::new();
        let mut channels = Vec::new();

        let answered = self.responses.for_responder(user)?;
        let mut owned = Vec::new();
        for item in self.items.owned_by(user)? {
            owned.extend(self.responses.for_item(&item.id)?);
        }

        for response in answered.into_iter().chain(owned) {
            if response.status == ResponseStatus::Accepted && seen.insert(response.id.clone()) {
                channels.push(response.id);
            }
        }
        Ok(channels)
    }
}
