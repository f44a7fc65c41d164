use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use super::domain::ChatMessage;
use crate::workflows::claims::domain::ResponseId;

type Channels = HashMap<ResponseId, broadcast::Sender<ChatMessage>>;

/// Live subscribers per chat channel.
///
/// A channel slot exists only while at least one subscription to it is alive; it is created
/// by the first `subscribe` and released when the last subscription is dropped.
pub struct ChannelSubscriberRegistry {
    capacity: usize,
    channels: Mutex<Channels>,
}

impl ChannelSubscriberRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(self: &Arc<Self>, channel: &ResponseId) -> ChannelSubscription {
        let receiver = {
            let mut channels = self.lock();
            channels
                .entry(channel.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };
        debug!(response_id = %channel.0, "chat subscriber joined");

        ChannelSubscription {
            channel: channel.clone(),
            receiver: Some(receiver),
            registry: Arc::clone(self),
        }
    }

    /// Fan a persisted message out to current subscribers. Returns how many received it.
    pub fn publish(&self, message: &ChatMessage) -> usize {
        let channels = self.lock();
        match channels.get(&message.response_id) {
            Some(sender) => sender.send(message.clone()).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, channel: &ResponseId) -> usize {
        self.lock()
            .get(channel)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    pub fn active_channels(&self) -> usize {
        self.lock().len()
    }

    /// Called after the departing receiver is gone, so an idle slot has no receivers left.
    fn release(&self, channel: &ResponseId) {
        let mut channels = self.lock();
        let last = channels
            .get(channel)
            .map(|sender| sender.receiver_count() == 0)
            .unwrap_or(false);
        if last {
            channels.remove(channel);
        }
        debug!(response_id = %channel.0, released = last, "chat subscriber left");
    }

    fn lock(&self) -> MutexGuard<'_, Channels> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One connection's view of a channel. Dropping it leaves the channel.
pub struct ChannelSubscription {
    channel: ResponseId,
    // Only `None` while dropping.
    receiver: Option<broadcast::Receiver<ChatMessage>>,
    registry: Arc<ChannelSubscriberRegistry>,
}

impl ChannelSubscription {
    pub fn channel(&self) -> &ResponseId {
        &self.channel
    }

    /// Wait for the next message. Messages missed by a lagging subscriber are skipped; the
    /// client recovers them from history.
    pub async fn next(&mut self) -> Option<ChatMessage> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(response_id = %self.channel.0, skipped, "chat subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Self::next`].
    pub fn try_next(&mut self) -> Option<ChatMessage> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(response_id = %self.channel.0, skipped, "chat subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        self.registry.release(&self.channel);
    }
}
