use std::sync::Arc;

use tracing::{debug, info};

use super::domain::ItemId;
use super::repository::{ItemRepository, RepositoryError};
use crate::workflows::WorkflowError;

/// Derives the item status from its accepted response.
///
/// Lost and Found items resolve the same way; there is no path back to Open.
pub struct ItemStatusProjector<I> {
    items: Arc<I>,
}

impl<I> ItemStatusProjector<I>
where
    I: ItemRepository + 'static,
{
    pub fn new(items: Arc<I>) -> Self {
        Self { items }
    }

    /// Mark the item Resolved. Returns whether this call changed anything.
    pub fn resolve(&self, item_id: &ItemId) -> Result<bool, WorkflowError> {
        match self.items.mark_resolved(item_id) {
            Ok(true) => {
                info!(item_id = %item_id.0, "item resolved");
                Ok(true)
            }
            Ok(false) => {
                debug!(item_id = %item_id.0, "item already resolved");
                Ok(false)
            }
            Err(RepositoryError::NotFound) => Err(WorkflowError::item_not_found(&item_id.0)),
            Err(other) => Err(other.into()),
        }
    }
}
