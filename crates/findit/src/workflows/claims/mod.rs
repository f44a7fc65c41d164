//! Item responses and the accept workflow that resolves an item.

pub mod domain;
pub mod orchestrator;
pub(crate) mod projector;
pub mod repository;
pub mod router;
pub(crate) mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Item, ItemCategory, ItemClass, ItemId, ItemReport, ItemResponse, ItemStatus, ResponseId,
    ResponseStatus, ResponseSubmission, StatusChange, UserId,
};
pub use orchestrator::ResolutionOrchestrator;
pub use repository::{
    ItemRepository, ItemView, RepositoryError, ResponseRepository, ResponseView,
    TransitionOutcome,
};
pub use router::claims_router;
