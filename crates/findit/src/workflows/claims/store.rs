use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{Item, ItemId, ItemResponse, ResponseId, ResponseStatus, UserId};
use super::repository::{ItemRepository, RepositoryError, ResponseRepository, TransitionOutcome};
use crate::workflows::WorkflowError;

static RESPONSE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_response_id() -> ResponseId {
    let id = RESPONSE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ResponseId(format!("rsp-{id:06}"))
}

/// Owns response records and every status transition applied to them.
pub struct ResponseStore<I, R> {
    items: Arc<I>,
    responses: Arc<R>,
}

impl<I, R> ResponseStore<I, R>
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
{
    pub fn new(items: Arc<I>, responses: Arc<R>) -> Self {
        Self { items, responses }
    }

    /// Record a new Pending response against an open item.
    pub fn create(
        &self,
        item_id: &ItemId,
        responder: &UserId,
        message: &str,
        claiming_match: bool,
    ) -> Result<ItemResponse, WorkflowError> {
        if message.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "response message must not be empty".to_string(),
            ));
        }

        let item = self.item(item_id)?;
        if !item.status.is_open() {
            return Err(WorkflowError::InvalidTransition(format!(
                "item {} is resolved and no longer takes responses",
                item.id.0
            )));
        }

        let now = Utc::now();
        let record = ItemResponse {
            id: next_response_id(),
            item_id: item.id,
            responder: responder.clone(),
            message: message.to_string(),
            claiming_match,
            status: ResponseStatus::Pending,
            created_at: now,
            updated_at: now,
            notified_at: None,
        };

        let stored = self.responses.insert(record)?;
        info!(
            response_id = %stored.id.0,
            item_id = %stored.item_id.0,
            claiming_match,
            "response submitted"
        );
        Ok(stored)
    }

    pub fn item(&self, item_id: &ItemId) -> Result<Item, WorkflowError> {
        self.items
            .fetch(item_id)?
            .ok_or_else(|| WorkflowError::item_not_found(&item_id.0))
    }

    /// Load a response together with its parent item.
    pub fn load(&self, response_id: &ResponseId) -> Result<(ItemResponse, Item), WorkflowError> {
        let record = self
            .responses
            .fetch(response_id)?
            .ok_or_else(|| WorkflowError::response_not_found(&response_id.0))?;
        let item = self.item(&record.item_id)?;
        Ok((record, item))
    }

    /// Direct owner-driven status change.
    ///
    /// Accepting through this path skips the cascade, so only the orchestrator reaches it.
    pub(crate) fn set_status(
        &self,
        response_id: &ResponseId,
        requester: &UserId,
        next: ResponseStatus,
    ) -> Result<ItemResponse, WorkflowError> {
        let (record, item) = self.load(response_id)?;
        authorize_owner(&item, requester)?;
        self.transition(&record, next)
    }

    /// Compare-and-set from the record's current Pending status to `next`.
    pub(crate) fn transition(
        &self,
        record: &ItemResponse,
        next: ResponseStatus,
    ) -> Result<ItemResponse, WorkflowError> {
        if !record.status.can_transition_to(next) {
            return Err(WorkflowError::invalid_transition(record.status, next));
        }

        match self
            .responses
            .transition(&record.id, ResponseStatus::Pending, next)?
        {
            TransitionOutcome::Applied(updated) => {
                debug!(
                    response_id = %updated.id.0,
                    status = updated.status.label(),
                    "response status updated"
                );
                Ok(updated)
            }
            TransitionOutcome::Stale(current) if current.status == ResponseStatus::Pending => {
                Err(WorkflowError::InvalidTransition(format!(
                    "another response on item {} was already accepted",
                    current.item_id.0
                )))
            }
            TransitionOutcome::Stale(current) => {
                Err(WorkflowError::invalid_transition(current.status, next))
            }
        }
    }

    /// Reject every other Pending response on the item. Safe to repeat.
    pub(crate) fn reject_siblings(
        &self,
        item_id: &ItemId,
        except: &ResponseId,
    ) -> Result<usize, WorkflowError> {
        let rejected = self.responses.reject_pending(item_id, except)?;
        if rejected > 0 {
            info!(item_id = %item_id.0, rejected, "competing responses rejected");
        }
        Ok(rejected)
    }

    /// Whether this caller is the one to send the acceptance notification.
    pub(crate) fn claim_notification(
        &self,
        response_id: &ResponseId,
    ) -> Result<bool, WorkflowError> {
        match self.responses.claim_notification(response_id) {
            Ok(claimed) => Ok(claimed),
            Err(RepositoryError::NotFound) => {
                Err(WorkflowError::response_not_found(&response_id.0))
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn for_item(&self, item_id: &ItemId) -> Result<Vec<ItemResponse>, WorkflowError> {
        Ok(self.responses.for_item(item_id)?)
    }

    pub fn for_responder(&self, responder: &UserId) -> Result<Vec<ItemResponse>, WorkflowError> {
        Ok(self.responses.for_responder(responder)?)
    }
}

pub(crate) fn authorize_owner(item: &Item, requester: &UserId) -> Result<(), WorkflowError> {
    if item.is_owned_by(requester) {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden(format!(
            "only the owner of item {} may change its responses",
            item.id.0
        )))
    }
}
