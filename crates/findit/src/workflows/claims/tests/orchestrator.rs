use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::memory::{MemoryItemRepository, MemoryOutbox, MemoryResponseRepository};
use crate::notifications::{DispatchGateway, NotificationKind};
use crate::workflows::claims::domain::{
    ItemCategory, ItemId, ItemStatus, ResponseId, ResponseStatus,
};
use crate::workflows::claims::repository::{ItemRepository, ResponseRepository};
use crate::workflows::claims::ResolutionOrchestrator;
use crate::workflows::WorkflowError;

#[test]
fn report_item_starts_open_and_requires_name() {
    let harness = harness();
    let item = harness
        .orchestrator
        .report_item(&user("dana"), wallet_report())
        .expect("item reported");
    assert_eq!(item.status, ItemStatus::Open);
    assert_eq!(item.owner, user("dana"));
    assert_eq!(item.category, ItemCategory::Found);

    let mut nameless = wallet_report();
    nameless.name = "   ".to_string();
    assert!(matches!(
        harness.orchestrator.report_item(&user("dana"), nameless),
        Err(WorkflowError::Validation(_))
    ));
}

#[test]
fn submit_notifies_owner_once_per_response() {
    let harness = harness();
    let (item, claim, _) = contested_wallet(&harness);

    let sent = sent_of_kind(&harness.outbox, NotificationKind::ClaimSubmitted);
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|envelope| envelope.recipient == user("dana")));
    assert_eq!(
        sent[0].subject,
        "Someone claimed a match for your found item: Black Wallet"
    );
    assert_eq!(sent[1].subject, "New response on your found item: Black Wallet");

    assert_eq!(claim.item_id, item.id);
    assert_eq!(claim.status, ResponseStatus::Pending);
}

#[test]
fn submit_to_missing_item_is_not_found() {
    let harness = harness();
    match harness.orchestrator.submit_response(
        &ItemId("item-999999".into()),
        &user("sam"),
        submission("mine", true),
    ) {
        Err(WorkflowError::NotFound { .. }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    assert!(harness.outbox.envelopes().is_empty());
}

#[test]
fn black_wallet_acceptance_resolves_rejects_and_notifies() {
    let harness = harness();
    let (item, claim, tip) = contested_wallet(&harness);

    let accepted = harness
        .orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("owner accepts claim");
    assert_eq!(accepted.status, ResponseStatus::Accepted);

    let stored_item = harness.orchestrator.item(&item.id).expect("item present");
    assert_eq!(stored_item.status, ItemStatus::Resolved);

    let tip = harness
        .responses
        .fetch(&tip.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(tip.status, ResponseStatus::Rejected);

    let accepted_mail = sent_of_kind(&harness.outbox, NotificationKind::MatchAccepted);
    assert_eq!(accepted_mail.len(), 1);
    assert_eq!(accepted_mail[0].recipient, user("sam"));
    assert_eq!(
        accepted_mail[0].subject,
        "Your claim on Black Wallet was accepted"
    );
    assert!(accepted_mail[0].body.contains("now resolved"));
}

#[test]
fn acceptance_does_not_require_claiming_match() {
    let harness = harness();
    let (item, _, tip) = contested_wallet(&harness);

    harness
        .orchestrator
        .accept_response(&tip.id, &user("dana"))
        .expect("tips can be accepted");
    assert_eq!(
        harness.orchestrator.item(&item.id).expect("item").status,
        ItemStatus::Resolved
    );
}

#[test]
fn only_the_owner_may_accept() {
    let harness = harness();
    let (item, claim, _) = contested_wallet(&harness);

    for intruder in ["sam", "lee", "mallory"] {
        match harness.orchestrator.accept_response(&claim.id, &user(intruder)) {
            Err(WorkflowError::Forbidden(_)) => {}
            other => panic!("expected forbidden for {intruder}, got {other:?}"),
        }
    }

    assert_eq!(
        harness.orchestrator.item(&item.id).expect("item").status,
        ItemStatus::Open
    );
    assert!(sent_of_kind(&harness.outbox, NotificationKind::MatchAccepted).is_empty());
}

#[test]
fn repeated_accept_is_idempotent_and_notifies_once() {
    let harness = harness();
    let (_, claim, _) = contested_wallet(&harness);

    let first = harness
        .orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("first accept");
    let second = harness
        .orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("replayed accept");

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, ResponseStatus::Accepted);
    assert!(first.notified_at.is_some());
    assert_eq!(first.notified_at, second.notified_at);
    assert_eq!(
        sent_of_kind(&harness.outbox, NotificationKind::MatchAccepted).len(),
        1
    );
}

#[test]
fn accepting_a_sibling_after_resolution_fails() {
    let harness = harness();
    let (_, claim, tip) = contested_wallet(&harness);

    harness
        .orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("claim accepted");

    match harness.orchestrator.accept_response(&tip.id, &user("dana")) {
        Err(WorkflowError::InvalidTransition(reason)) => {
            assert!(reason.contains("rejected"), "{reason}");
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn late_response_on_resolved_item_is_refused() {
    let harness = harness();
    let (item, claim, _) = contested_wallet(&harness);
    harness
        .orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("claim accepted");

    match harness.orchestrator.submit_response(
        &item.id,
        &user("kai"),
        submission("actually it is mine", true),
    ) {
        Err(WorkflowError::InvalidTransition(_)) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn pending_response_on_resolved_item_cannot_be_accepted() {
    let harness = harness();
    let (item, claim, _) = contested_wallet(&harness);
    // Item resolved out of band while the claim is still Pending.
    harness.items.mark_resolved(&item.id).expect("resolve");

    match harness.orchestrator.accept_response(&claim.id, &user("dana")) {
        Err(WorkflowError::InvalidTransition(reason)) => {
            assert!(reason.contains("already resolved"), "{reason}");
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn reject_has_no_cascade_and_no_notification() {
    let harness = harness();
    let (item, claim, tip) = contested_wallet(&harness);
    let before = harness.outbox.envelopes().len();

    let rejected = harness
        .orchestrator
        .reject_response(&tip.id, &user("dana"))
        .expect("owner rejects tip");
    assert_eq!(rejected.status, ResponseStatus::Rejected);

    let claim = harness
        .responses
        .fetch(&claim.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(claim.status, ResponseStatus::Pending);
    assert_eq!(
        harness.orchestrator.item(&item.id).expect("item").status,
        ItemStatus::Open
    );
    assert_eq!(harness.outbox.envelopes().len(), before);
}

#[test]
fn set_status_routes_by_requested_state() {
    let harness = harness();
    let (_, claim, tip) = contested_wallet(&harness);

    match harness
        .orchestrator
        .set_response_status(&claim.id, &user("dana"), ResponseStatus::Pending)
    {
        Err(WorkflowError::InvalidTransition(_)) => {}
        other => panic!("expected pending to be refused, got {other:?}"),
    }

    let accepted = harness
        .orchestrator
        .set_response_status(&claim.id, &user("dana"), ResponseStatus::Accepted)
        .expect("accept via status change");
    assert_eq!(accepted.status, ResponseStatus::Accepted);

    // The cascade already rejected the tip.
    match harness
        .orchestrator
        .set_response_status(&tip.id, &user("dana"), ResponseStatus::Rejected)
    {
        Err(WorkflowError::InvalidTransition(_)) => {}
        other => panic!("expected terminal tip, got {other:?}"),
    }
}

#[test]
fn notification_failure_does_not_block_acceptance() {
    let items = Arc::new(MemoryItemRepository::default());
    let responses = Arc::new(MemoryResponseRepository::default());
    let gateway = Arc::new(DispatchGateway::new(Arc::new(UnreachableRelay), "FindIt"));
    let orchestrator = ResolutionOrchestrator::new(items.clone(), responses.clone(), gateway);

    let item = orchestrator
        .report_item(&user("dana"), wallet_report())
        .expect("item reported");
    let claim = orchestrator
        .submit_response(&item.id, &user("sam"), submission("mine", true))
        .expect("submission survives failed owner mail");

    let accepted = orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("acceptance survives failed responder mail");
    assert_eq!(accepted.status, ResponseStatus::Accepted);
    assert_eq!(
        items.fetch(&item.id).expect("fetch").expect("present").status,
        ItemStatus::Resolved
    );
}

#[test]
fn replayed_accept_completes_interrupted_resolution() {
    let items = Arc::new(FlakyItems::default());
    let responses = Arc::new(MemoryResponseRepository::default());
    let outbox = Arc::new(MemoryOutbox::default());
    let gateway = Arc::new(DispatchGateway::new(outbox.clone(), "FindIt"));
    let orchestrator = ResolutionOrchestrator::new(items.clone(), responses.clone(), gateway);

    let item = orchestrator
        .report_item(&user("dana"), wallet_report())
        .expect("item reported");
    let claim = orchestrator
        .submit_response(&item.id, &user("sam"), submission("mine", true))
        .expect("claim");
    let tip = orchestrator
        .submit_response(&item.id, &user("lee"), submission("saw it", false))
        .expect("tip");

    items.fail_next_resolve.store(true, Ordering::SeqCst);
    match orchestrator.accept_response(&claim.id, &user("dana")) {
        Err(WorkflowError::Repository(_)) => {}
        other => panic!("expected storage failure, got {other:?}"),
    }
    let half_done = responses.fetch(&tip.id).expect("fetch").expect("present");
    assert_eq!(half_done.status, ResponseStatus::Pending);

    orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("replay completes the resolution");
    assert_eq!(
        items.fetch(&item.id).expect("fetch").expect("present").status,
        ItemStatus::Resolved
    );
    let tip = responses.fetch(&tip.id).expect("fetch").expect("present");
    assert_eq!(tip.status, ResponseStatus::Rejected);

    let accepted_mail = sent_of_kind(&outbox, NotificationKind::MatchAccepted);
    assert_eq!(accepted_mail.len(), 1);
    assert_eq!(accepted_mail[0].recipient, user("sam"));

    orchestrator
        .accept_response(&claim.id, &user("dana"))
        .expect("second replay is a no-op");
    assert_eq!(sent_of_kind(&outbox, NotificationKind::MatchAccepted).len(), 1);
}

#[test]
fn storage_outage_surfaces_as_repository_error() {
    let orchestrator = ResolutionOrchestrator::new(
        Arc::new(UnavailableItems),
        Arc::new(MemoryResponseRepository::default()),
        Arc::new(DispatchGateway::new(
            Arc::new(MemoryOutbox::default()),
            "FindIt",
        )),
    );

    match orchestrator.accept_response(&ResponseId("rsp-any".into()), &user("dana")) {
        Err(WorkflowError::NotFound { .. }) => {}
        other => panic!("expected missing response, got {other:?}"),
    }
    match orchestrator.report_item(&user("dana"), wallet_report()) {
        Err(WorkflowError::Repository(_)) => {}
        other => panic!("expected repository error, got {other:?}"),
    }
}

#[test]
fn concurrent_accepts_admit_exactly_one_response() {
    for _ in 0..16 {
        let harness = harness();
        let item = harness
            .orchestrator
            .report_item(&user("dana"), wallet_report())
            .expect("item reported");
        let candidates: Vec<ResponseId> = ["sam", "lee", "kai", "ana"]
            .iter()
            .map(|responder| {
                harness
                    .orchestrator
                    .submit_response(&item.id, &user(responder), submission("mine", true))
                    .expect("submitted")
                    .id
            })
            .collect();

        let outcomes: Vec<Result<ResponseId, WorkflowError>> = thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .iter()
                .map(|id| {
                    let orchestrator = Arc::clone(&harness.orchestrator);
                    scope.spawn(move || {
                        orchestrator
                            .accept_response(id, &user("dana"))
                            .map(|record| record.id)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread completes"))
                .collect()
        });

        let winners: Vec<&ResponseId> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one accept succeeds: {outcomes:?}");
        assert!(outcomes
            .iter()
            .filter(|outcome| outcome.is_err())
            .all(|outcome| matches!(outcome, Err(WorkflowError::InvalidTransition(_)))));

        let accepted: Vec<_> = harness
            .responses
            .for_item(&item.id)
            .expect("list")
            .into_iter()
            .filter(|record| record.status == ResponseStatus::Accepted)
            .collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(&accepted[0].id, winners[0]);
        assert_eq!(
            sent_of_kind(&harness.outbox, NotificationKind::MatchAccepted).len(),
            1
        );
    }
}

#[test]
fn listings_follow_submission_and_recency_order() {
    let harness = harness();
    let (item, claim, tip) = contested_wallet(&harness);
    let second_item = harness
        .orchestrator
        .report_item(&user("kai"), wallet_report())
        .expect("second item");
    let later = harness
        .orchestrator
        .submit_response(&second_item.id, &user("sam"), submission("also mine?", false))
        .expect("later response");

    let on_item: Vec<ResponseId> = harness
        .orchestrator
        .list_responses(&item.id)
        .expect("list")
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(on_item, vec![claim.id.clone(), tip.id]);

    let mine: Vec<ResponseId> = harness
        .orchestrator
        .list_my_responses(&user("sam"))
        .expect("list")
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(mine, vec![later.id, claim.id]);

    assert!(matches!(
        harness.orchestrator.list_responses(&ItemId("item-missing".into())),
        Err(WorkflowError::NotFound { .. })
    ));
}
