use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::memory::{MemoryItemRepository, MemoryOutbox, MemoryResponseRepository};
use crate::notifications::{
    DeliveryError, DispatchGateway, Envelope, NotificationKind, NotificationTransport,
};
use crate::workflows::claims::domain::{
    Item, ItemCategory, ItemClass, ItemId, ItemReport, ItemResponse, ResponseSubmission, UserId,
};
use crate::workflows::claims::repository::{ItemRepository, RepositoryError};
use crate::workflows::claims::ResolutionOrchestrator;

pub(super) type Orchestrator = ResolutionOrchestrator<
    MemoryItemRepository,
    MemoryResponseRepository,
    DispatchGateway<MemoryOutbox>,
>;

pub(super) struct Harness {
    pub(super) orchestrator: Arc<Orchestrator>,
    pub(super) items: Arc<MemoryItemRepository>,
    pub(super) responses: Arc<MemoryResponseRepository>,
    pub(super) outbox: Arc<MemoryOutbox>,
}

pub(super) fn harness() -> Harness {
    let items = Arc::new(MemoryItemRepository::default());
    let responses = Arc::new(MemoryResponseRepository::default());
    let outbox = Arc::new(MemoryOutbox::default());
    let gateway = Arc::new(DispatchGateway::new(outbox.clone(), "FindIt"));
    let orchestrator = Arc::new(ResolutionOrchestrator::new(
        items.clone(),
        responses.clone(),
        gateway,
    ));
    Harness {
        orchestrator,
        items,
        responses,
        outbox,
    }
}

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn wallet_report() -> ItemReport {
    ItemReport {
        name: "Black Wallet".to_string(),
        description: "Leather bifold with a library card".to_string(),
        category: ItemCategory::Found,
        item_class: ItemClass::Accessories,
        location: "Main library, 2nd floor".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date"),
        images: vec!["uploads/wallet-front.jpg".to_string()],
    }
}

pub(super) fn submission(message: &str, claiming_match: bool) -> ResponseSubmission {
    ResponseSubmission {
        message: message.to_string(),
        claiming_match,
    }
}

/// An Open item owned by "dana" with one claim from "sam" and one tip from "lee".
pub(super) fn contested_wallet(harness: &Harness) -> (Item, ItemResponse, ItemResponse) {
    let item = harness
        .orchestrator
        .report_item(&user("dana"), wallet_report())
        .expect("item reported");
    let claim = harness
        .orchestrator
        .submit_response(&item.id, &user("sam"), submission("That's mine!", true))
        .expect("claim submitted");
    let tip = harness
        .orchestrator
        .submit_response(
            &item.id,
            &user("lee"),
            submission("I saw someone drop it near the stairs", false),
        )
        .expect("tip submitted");
    (item, claim, tip)
}

pub(super) fn sent_of_kind(outbox: &MemoryOutbox, kind: NotificationKind) -> Vec<Envelope> {
    outbox
        .envelopes()
        .into_iter()
        .filter(|envelope| envelope.kind == kind)
        .collect()
}

pub(super) struct UnreachableRelay;

impl NotificationTransport for UnreachableRelay {
    fn deliver(&self, _envelope: &Envelope) -> Result<String, DeliveryError> {
        Err(DeliveryError::Transport("smtp relay timed out".to_string()))
    }
}

/// Item repository whose next `mark_resolved` fails once after being armed.
#[derive(Default)]
pub(super) struct FlakyItems {
    pub(super) inner: MemoryItemRepository,
    pub(super) fail_next_resolve: AtomicBool,
}

impl ItemRepository for FlakyItems {
    fn insert(&self, item: Item) -> Result<Item, RepositoryError> {
        self.inner.insert(item)
    }

    fn fetch(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn owned_by(&self, owner: &UserId) -> Result<Vec<Item>, RepositoryError> {
        self.inner.owned_by(owner)
    }

    fn mark_resolved(&self, id: &ItemId) -> Result<bool, RepositoryError> {
        if self.fail_next_resolve.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.mark_resolved(id)
    }
}

pub(super) struct UnavailableItems;

impl ItemRepository for UnavailableItems {
    fn insert(&self, _item: Item) -> Result<Item, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn owned_by(&self, _owner: &UserId) -> Result<Vec<Item>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn mark_resolved(&self, _id: &ItemId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
