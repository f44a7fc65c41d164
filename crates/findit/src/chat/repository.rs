use super::domain::{ChatMessage, NewMessage};
use crate::workflows::claims::domain::{ResponseId, UserId};
use crate::workflows::claims::repository::RepositoryError;

/// Storage abstraction for channel messages.
pub trait MessageRepository: Send + Sync {
    /// Persist a message, assigning its id and insertion sequence. The sender has read it.
    fn append(&self, message: NewMessage) -> Result<ChatMessage, RepositoryError>;
    /// Messages of a channel, oldest first; equal timestamps keep insertion order.
    fn list(&self, channel: &ResponseId) -> Result<Vec<ChatMessage>, RepositoryError>;
    /// Add `reader` to every message of the channel it has not read. Returns how many changed.
    fn mark_read(&self, channel: &ResponseId, reader: &UserId) -> Result<usize, RepositoryError>;
    /// Messages in `channels` that `reader` has not read.
    fn count_unread(
        &self,
        reader: &UserId,
        channels: &[ResponseId],
    ) -> Result<usize, RepositoryError>;
}
