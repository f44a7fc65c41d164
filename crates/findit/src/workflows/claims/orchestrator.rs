use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Item, ItemId, ItemReport, ItemResponse, ItemStatus, ResponseId, ResponseStatus,
    ResponseSubmission, UserId,
};
use super::projector::ItemStatusProjector;
use super::repository::{ItemRepository, ResponseRepository};
use super::store::{authorize_owner, ResponseStore};
use crate::notifications::{NotificationGateway, NotificationKind, NotificationPayload};
use crate::workflows::WorkflowError;

static ITEM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_item_id() -> ItemId {
    let id = ITEM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ItemId(format!("item-{id:06}"))
}

/// Drives response status changes and the side effects of accepting one.
///
/// Acceptance runs as an ordered sequence: compare-and-set the response to Accepted, resolve
/// the item, reject the remaining Pending responses, then notify the responder. Every step
/// is idempotent: the notification is claimed through a stamp on the response, so a caller
/// may replay `accept_response` after a partial failure and the missing steps, the
/// notification included, run exactly once.
pub struct ResolutionOrchestrator<I, R, N> {
    items: Arc<I>,
    store: ResponseStore<I, R>,
    projector: ItemStatusProjector<I>,
    notifier: Arc<N>,
}

impl<I, R, N> ResolutionOrchestrator<I, R, N>
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    pub fn new(items: Arc<I>, responses: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            store: ResponseStore::new(items.clone(), responses),
            projector: ItemStatusProjector::new(items.clone()),
            items,
            notifier,
        }
    }

    /// Register a new Open item owned by `owner`.
    pub fn report_item(&self, owner: &UserId, report: ItemReport) -> Result<Item, WorkflowError> {
        if report.name.trim().is_empty() {
            return Err(WorkflowError::Validation("item name must not be empty".to_string()));
        }
        if report.location.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "item location must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let item = Item {
            id: next_item_id(),
            owner: owner.clone(),
            name: report.name.trim().to_string(),
            description: report.description,
            category: report.category,
            item_class: report.item_class,
            location: report.location.trim().to_string(),
            date: report.date,
            images: report.images,
            status: ItemStatus::Open,
            created_at: now,
            updated_at: now,
        };

        let stored = self.items.insert(item)?;
        info!(item_id = %stored.id.0, category = stored.category.label(), "item reported");
        Ok(stored)
    }

    pub fn item(&self, item_id: &ItemId) -> Result<Item, WorkflowError> {
        self.store.item(item_id)
    }

    /// Record a response and tell the item owner about it.
    pub fn submit_response(
        &self,
        item_id: &ItemId,
        responder: &UserId,
        submission: ResponseSubmission,
    ) -> Result<ItemResponse, WorkflowError> {
        let record = self.store.create(
            item_id,
            responder,
            &submission.message,
            submission.claiming_match,
        )?;
        let item = self.store.item(&record.item_id)?;

        let payload = NotificationPayload {
            owner: item.owner.clone(),
            responder: record.responder.clone(),
            message: Some(record.message.clone()),
            claiming_match: record.claiming_match,
            item,
        };
        let report = self
            .notifier
            .notify(NotificationKind::ClaimSubmitted, &payload.owner, &payload);
        if !report.delivered {
            warn!(
                response_id = %record.id.0,
                detail = %report.detail,
                "owner was not notified of new response"
            );
        }

        Ok(record)
    }

    /// Route an owner's status request to the accept or reject path.
    pub fn set_response_status(
        &self,
        response_id: &ResponseId,
        requester: &UserId,
        status: ResponseStatus,
    ) -> Result<ItemResponse, WorkflowError> {
        match status {
            ResponseStatus::Accepted => self.accept_response(response_id, requester),
            ResponseStatus::Rejected => self.reject_response(response_id, requester),
            ResponseStatus::Pending => {
                let (record, item) = self.store.load(response_id)?;
                authorize_owner(&item, requester)?;
                Err(WorkflowError::invalid_transition(
                    record.status,
                    ResponseStatus::Pending,
                ))
            }
        }
    }

    pub fn accept_response(
        &self,
        response_id: &ResponseId,
        requester: &UserId,
    ) -> Result<ItemResponse, WorkflowError> {
        let (record, item) = self.store.load(response_id)?;
        authorize_owner(&item, requester)?;

        match record.status {
            ResponseStatus::Accepted => {
                debug!(response_id = %record.id.0, "accept replayed on accepted response");
                self.complete_resolution(&record)?;
                self.notify_accepted(&record)?;
                return self.store.load(response_id).map(|(current, _)| current);
            }
            ResponseStatus::Rejected => {
                return Err(WorkflowError::invalid_transition(
                    ResponseStatus::Rejected,
                    ResponseStatus::Accepted,
                ));
            }
            ResponseStatus::Pending if !item.status.is_open() => {
                return Err(WorkflowError::InvalidTransition(format!(
                    "item {} is already resolved",
                    item.id.0
                )));
            }
            ResponseStatus::Pending => {}
        }

        let accepted = match self.store.transition(&record, ResponseStatus::Accepted) {
            Ok(accepted) => accepted,
            Err(WorkflowError::InvalidTransition(reason)) => {
                // A concurrent accept of this same response won the compare-and-set.
                let (current, _) = self.store.load(response_id)?;
                if current.status == ResponseStatus::Accepted {
                    self.complete_resolution(&current)?;
                    self.notify_accepted(&current)?;
                    return self.store.load(response_id).map(|(current, _)| current);
                }
                info!(response_id = %record.id.0, %reason, "accept lost to a competing response");
                return Err(WorkflowError::InvalidTransition(reason));
            }
            Err(other) => return Err(other),
        };

        self.complete_resolution(&accepted)?;
        self.notify_accepted(&accepted)?;

        info!(
            response_id = %accepted.id.0,
            item_id = %accepted.item_id.0,
            claiming_match = accepted.claiming_match,
            "response accepted"
        );
        self.store.load(response_id).map(|(current, _)| current)
    }

    /// Owner-driven rejection of a single Pending response. No cascade, no notification.
    pub fn reject_response(
        &self,
        response_id: &ResponseId,
        requester: &UserId,
    ) -> Result<ItemResponse, WorkflowError> {
        let rejected = self
            .store
            .set_status(response_id, requester, ResponseStatus::Rejected)?;
        info!(response_id = %rejected.id.0, "response rejected by owner");
        Ok(rejected)
    }

    pub fn list_responses(&self, item_id: &ItemId) -> Result<Vec<ItemResponse>, WorkflowError> {
        self.store.item(item_id)?;
        self.store.for_item(item_id)
    }

    pub fn list_my_responses(
        &self,
        responder: &UserId,
    ) -> Result<Vec<ItemResponse>, WorkflowError> {
        self.store.for_responder(responder)
    }

    fn complete_resolution(&self, accepted: &ItemResponse) -> Result<(), WorkflowError> {
        self.projector.resolve(&accepted.item_id)?;
        self.store.reject_siblings(&accepted.item_id, &accepted.id)?;
        Ok(())
    }

    /// Tell the responder once. A failed delivery is logged and not retried.
    fn notify_accepted(&self, accepted: &ItemResponse) -> Result<(), WorkflowError> {
        if !self.store.claim_notification(&accepted.id)? {
            debug!(response_id = %accepted.id.0, "acceptance already notified");
            return Ok(());
        }

        let item = self.store.item(&accepted.item_id)?;
        let payload = NotificationPayload {
            owner: item.owner.clone(),
            responder: accepted.responder.clone(),
            message: Some(accepted.message.clone()),
            claiming_match: accepted.claiming_match,
            item,
        };
        let report = self
            .notifier
            .notify(NotificationKind::MatchAccepted, &accepted.responder, &payload);
        if !report.delivered {
            warn!(
                response_id = %accepted.id.0,
                detail = %report.detail,
                "responder was not notified of acceptance"
            );
        }
        Ok(())
    }
}
