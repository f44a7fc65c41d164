use chrono::Utc;
use clap::Args;
use findit::chat::{ChannelSubscriberRegistry, ChatChannel, ChatMessage};
use findit::error::AppError;
use findit::memory::{
    MemoryItemRepository, MemoryMessageRepository, MemoryOutbox, MemoryResponseRepository,
};
use findit::notifications::{DispatchGateway, Envelope};
use findit::workflows::claims::{
    ItemCategory, ItemClass, ItemReport, ItemView, ResolutionOrchestrator, ResponseSubmission,
    ResponseView, UserId,
};
use findit::workflows::WorkflowError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// User who reports the found wallet
    #[arg(long, default_value = "dana")]
    pub(crate) owner: String,
    /// User whose claim gets accepted
    #[arg(long, default_value = "sam")]
    pub(crate) claimant: String,
    /// User whose competing claim is rejected by the cascade
    #[arg(long, default_value = "lee")]
    pub(crate) rival: String,
    /// Print the final state as JSON instead of a narrative
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
struct DemoSummary {
    item: ItemView,
    responses: Vec<ResponseView>,
    notifications: Vec<Envelope>,
    chat: Vec<ChatMessage>,
    live_deliveries: usize,
    claimant_unread: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let json = args.json;
    let summary = scenario(args)?;

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Summary unavailable: {err}"),
        }
        return Ok(());
    }

    println!(
        "\nItem {} \"{}\" -> {}",
        summary.item.item_id.0, summary.item.name, summary.item.status
    );
    println!("Responses:");
    for response in &summary.responses {
        println!(
            "  - {} from {} ({}): {}",
            response.response_id.0, response.responder.0, response.status, response.message
        );
    }
    println!("Notifications:");
    for envelope in &summary.notifications {
        println!(
            "  - [{}] to {}: {}",
            envelope.kind.label(),
            envelope.recipient.0,
            envelope.subject
        );
    }
    println!(
        "Chat ({} delivered live, {} unread for the claimant):",
        summary.live_deliveries, summary.claimant_unread
    );
    for message in &summary.chat {
        println!("  {}: {}", message.sender.0, message.content);
    }

    Ok(())
}

fn scenario(args: DemoArgs) -> Result<DemoSummary, WorkflowError> {
    let owner = UserId(args.owner);
    let claimant = UserId(args.claimant);
    let rival = UserId(args.rival);

    let items = Arc::new(MemoryItemRepository::default());
    let responses = Arc::new(MemoryResponseRepository::default());
    let messages = Arc::new(MemoryMessageRepository::default());
    let outbox = Arc::new(MemoryOutbox::default());
    let registry = Arc::new(ChannelSubscriberRegistry::new(16));
    let orchestrator = ResolutionOrchestrator::new(
        items.clone(),
        responses.clone(),
        Arc::new(DispatchGateway::new(outbox.clone(), "FindIt <noreply@findit.app>")),
    );
    let chat = ChatChannel::new(items, responses, messages, registry);

    println!("FindIt claim walkthrough");
    let item = orchestrator.report_item(
        &owner,
        ItemReport {
            name: "Black Wallet".to_string(),
            description: "Leather bifold with a student card".to_string(),
            category: ItemCategory::Found,
            item_class: ItemClass::Accessories,
            location: "Main library, 2nd floor".to_string(),
            date: Utc::now().date_naive(),
            images: Vec::new(),
        },
    )?;
    println!("- {} reported {} ({})", owner.0, item.name, item.id.0);

    let claim = orchestrator.submit_response(
        &item.id,
        &claimant,
        ResponseSubmission {
            message: "It's mine, the student card has my name on it".to_string(),
            claiming_match: true,
        },
    )?;
    let competing = orchestrator.submit_response(
        &item.id,
        &rival,
        ResponseSubmission {
            message: "I lost a black wallet there last week".to_string(),
            claiming_match: true,
        },
    )?;
    println!(
        "- {} and {} responded ({}, {})",
        claimant.0, rival.0, claim.id.0, competing.id.0
    );

    if chat.open_channel(&claim.id, &claimant).is_err() {
        println!("- chat stays locked while the claim is pending");
    }

    orchestrator.accept_response(&claim.id, &owner)?;
    println!("- {} accepted {}", owner.0, claim.id.0);

    let mut owner_feed = chat.subscribe(&claim.id, &owner)?;
    chat.post_message(&claim.id, &claimant, "Thank you! Can I pick it up at 5pm?")?;
    chat.post_message(&claim.id, &owner, "Sure, I'll be at the front desk.")?;

    let mut live_deliveries = 0;
    while owner_feed.try_next().is_some() {
        live_deliveries += 1;
    }
    drop(owner_feed);

    Ok(DemoSummary {
        item: ItemView::from(&orchestrator.item(&item.id)?),
        responses: orchestrator
            .list_responses(&item.id)?
            .iter()
            .map(ResponseView::from)
            .collect(),
        notifications: outbox.envelopes(),
        chat: chat.list_messages(&claim.id, &owner)?,
        live_deliveries,
        claimant_unread: chat.unread_count(&claimant)?,
    })
}
