use serde::Serialize;

use super::domain::{Item, ItemId, ItemResponse, ResponseId, ResponseStatus, UserId};

/// Storage abstraction for reported items.
pub trait ItemRepository: Send + Sync {
    fn insert(&self, item: Item) -> Result<Item, RepositoryError>;
    fn fetch(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError>;
    fn owned_by(&self, owner: &UserId) -> Result<Vec<Item>, RepositoryError>;
    /// Conditionally move an Open item to Resolved.
    ///
    /// Returns `Ok(true)` when this call performed the change, `Ok(false)` when the item
    /// was already Resolved, and `NotFound` when the item does not exist.
    fn mark_resolved(&self, id: &ItemId) -> Result<bool, RepositoryError>;
}

/// Result of a compare-and-set on a response status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The stored status matched the expectation and was replaced.
    Applied(ItemResponse),
    /// The stored record no longer matched; carries the record as currently stored.
    Stale(ItemResponse),
}

/// Storage abstraction for responses.
///
/// Implementations must make `transition` atomic with respect to every other write on the
/// same item: an `Accepted` transition is refused (reported as `Stale`) while another
/// response of the same item is already Accepted.
pub trait ResponseRepository: Send + Sync {
    fn insert(&self, record: ItemResponse) -> Result<ItemResponse, RepositoryError>;
    fn fetch(&self, id: &ResponseId) -> Result<Option<ItemResponse>, RepositoryError>;
    /// Responses on an item in submission order.
    fn for_item(&self, item_id: &ItemId) -> Result<Vec<ItemResponse>, RepositoryError>;
    /// Responses written by a user, newest first.
    fn for_responder(&self, responder: &UserId) -> Result<Vec<ItemResponse>, RepositoryError>;
    fn transition(
        &self,
        id: &ResponseId,
        expected: ResponseStatus,
        next: ResponseStatus,
    ) -> Result<TransitionOutcome, RepositoryError>;
    /// Stamp `notified_at` on an Accepted response that has none yet.
    ///
    /// Returns `Ok(true)` only for the call that set the stamp, so exactly one caller sends
    /// the acceptance notification.
    fn claim_notification(&self, id: &ResponseId) -> Result<bool, RepositoryError>;
    /// Move every Pending response on `item_id` other than `except` to Rejected.
    fn reject_pending(
        &self,
        item_id: &ItemId,
        except: &ResponseId,
    ) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of a response for API payloads.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub response_id: ResponseId,
    pub item_id: ItemId,
    pub responder: UserId,
    pub message: String,
    pub claiming_match: bool,
    pub status: &'static str,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ItemResponse> for ResponseView {
    fn from(record: &ItemResponse) -> Self {
        Self {
            response_id: record.id.clone(),
            item_id: record.item_id.clone(),
            responder: record.responder.clone(),
            message: record.message.clone(),
            claiming_match: record.claiming_match,
            status: record.status.label(),
            created_at: record.created_at,
        }
    }
}

/// Sanitized representation of an item for API payloads.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub item_id: ItemId,
    pub owner: UserId,
    pub name: String,
    pub category: &'static str,
    pub location: String,
    pub status: &'static str,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            item_id: item.id.clone(),
            owner: item.owner.clone(),
            name: item.name.clone(),
            category: item.category.label(),
            location: item.location.clone(),
            status: item.status.label(),
        }
    }
}
