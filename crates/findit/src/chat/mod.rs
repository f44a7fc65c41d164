//! Private chat between an item owner and the responder whose claim was accepted.
//!
//! A channel is keyed by the response id and exists only while that response is Accepted.
//! Membership is fixed to the owner and the responder; the [`ChatAccessGuard`] is the only
//! authorization check.

pub mod channel;
pub mod domain;
pub mod guard;
pub mod registry;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use channel::ChatChannel;
pub use domain::{ChannelMembers, ChannelSnapshot, ChatMessage, MessageDraft, MessageId, NewMessage};
pub use guard::{ChatAccessGuard, ResponseContext};
pub use registry::{ChannelSubscriberRegistry, ChannelSubscription};
pub use repository::MessageRepository;
pub use router::{chat_router, ChannelEvent};
