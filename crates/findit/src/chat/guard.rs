use super::domain::ChannelMembers;
use crate::workflows::claims::domain::{ItemResponse, ResponseStatus, UserId};
use crate::workflows::WorkflowError;

/// A response joined with the owner of the item it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    pub response: ItemResponse,
    pub owner: UserId,
}

impl ResponseContext {
    pub fn members(&self) -> ChannelMembers {
        ChannelMembers {
            owner: self.owner.clone(),
            responder: self.response.responder.clone(),
        }
    }
}

/// Single authorization surface for chat. Holds no state; fails closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatAccessGuard;

impl ChatAccessGuard {
    /// True only for the owner or responder of an Accepted response.
    pub fn can_access(&self, user: &UserId, context: Option<&ResponseContext>) -> bool {
        match context {
            Some(context) => {
                context.response.status == ResponseStatus::Accepted
                    && context.members().contains(user)
            }
            None => false,
        }
    }

    /// Gate form of [`Self::can_access`], yielding the channel members on success.
    pub fn admit(
        &self,
        user: &UserId,
        context: Option<&ResponseContext>,
    ) -> Result<ChannelMembers, WorkflowError> {
        match context {
            Some(context) if self.can_access(user, Some(context)) => Ok(context.members()),
            _ => Err(WorkflowError::Forbidden(
                "chat is only available to the owner and responder of an accepted response"
                    .to_string(),
            )),
        }
    }
}
