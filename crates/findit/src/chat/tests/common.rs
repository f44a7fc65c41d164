use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::chat::{ChannelSubscriberRegistry, ChatChannel};
use crate::memory::{
    MemoryItemRepository, MemoryMessageRepository, MemoryOutbox, MemoryResponseRepository,
};
use crate::notifications::DispatchGateway;
use crate::workflows::claims::domain::{
    Item, ItemCategory, ItemClass, ItemReport, ItemResponse, ResponseSubmission, UserId,
};
use crate::workflows::claims::ResolutionOrchestrator;

pub(super) type Channel =
    ChatChannel<MemoryItemRepository, MemoryResponseRepository, MemoryMessageRepository>;

pub(super) struct ChatHarness {
    pub(super) orchestrator: ResolutionOrchestrator<
        MemoryItemRepository,
        MemoryResponseRepository,
        DispatchGateway<MemoryOutbox>,
    >,
    pub(super) channel: Arc<Channel>,
    pub(super) registry: Arc<ChannelSubscriberRegistry>,
}

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 18, 30, 0).unwrap()
}

pub(super) fn chat_harness() -> ChatHarness {
    build(None)
}

/// Harness whose chat clock always reports the same instant.
pub(super) fn frozen_chat_harness() -> ChatHarness {
    build(Some(fixed_instant()))
}

fn build(frozen: Option<DateTime<Utc>>) -> ChatHarness {
    let items = Arc::new(MemoryItemRepository::default());
    let responses = Arc::new(MemoryResponseRepository::default());
    let messages = Arc::new(MemoryMessageRepository::default());
    let registry = Arc::new(ChannelSubscriberRegistry::new(16));
    let gateway = Arc::new(DispatchGateway::new(
        Arc::new(MemoryOutbox::default()),
        "FindIt",
    ));

    let orchestrator = ResolutionOrchestrator::new(items.clone(), responses.clone(), gateway);
    let mut channel = ChatChannel::new(items, responses, messages, registry.clone());
    if let Some(instant) = frozen {
        channel = channel.with_clock(move || instant);
    }

    ChatHarness {
        orchestrator,
        channel: Arc::new(channel),
        registry,
    }
}

pub(super) fn report() -> ItemReport {
    ItemReport {
        name: "Black Wallet".to_string(),
        description: "Leather bifold".to_string(),
        category: ItemCategory::Found,
        item_class: ItemClass::Accessories,
        location: "Main library".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date"),
        images: Vec::new(),
    }
}

fn submit(harness: &ChatHarness, item: &Item, responder: &str) -> ItemResponse {
    harness
        .orchestrator
        .submit_response(
            &item.id,
            &user(responder),
            ResponseSubmission {
                message: format!("{responder} thinks this is theirs"),
                claiming_match: true,
            },
        )
        .expect("response submitted")
}

/// Item of "dana" with a claim from "sam" (accepted) and one from "lee" (rejected by cascade).
pub(super) fn accepted_channel(harness: &ChatHarness) -> (ItemResponse, ItemResponse) {
    let item = harness
        .orchestrator
        .report_item(&user("dana"), report())
        .expect("item reported");
    let claim = submit(harness, &item, "sam");
    let rival = submit(harness, &item, "lee");
    let accepted = harness
        .orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("claim accepted");
    (accepted, rival)
}

/// Item of "dana" with a single claim from "sam" that is still Pending.
pub(super) fn pending_response(harness: &ChatHarness) -> ItemResponse {
    let item = harness
        .orchestrator
        .report_item(&user("dana"), report())
        .expect("item reported");
    submit(harness, &item, "sam")
}
