use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

use super::domain::{ItemId, ItemReport, ResponseId, ResponseSubmission, StatusChange};
use super::orchestrator::ResolutionOrchestrator;
use super::repository::{ItemRepository, ItemView, ResponseRepository, ResponseView};
use crate::auth::Caller;
use crate::notifications::NotificationGateway;

/// Router exposing item registration, response submission and owner decisions.
pub fn claims_router<I, R, N>(orchestrator: Arc<ResolutionOrchestrator<I, R, N>>) -> Router
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    Router::new()
        .route("/api/items", post(report_item_handler::<I, R, N>))
        .route("/api/items/:item_id", get(item_handler::<I, R, N>))
        .route(
            "/api/items/:item_id/responses",
            post(submit_handler::<I, R, N>).get(item_responses_handler::<I, R, N>),
        )
        .route("/api/responses/me", get(my_responses_handler::<I, R, N>))
        .route(
            "/api/responses/:response_id",
            put(status_handler::<I, R, N>),
        )
        .with_state(orchestrator)
}

pub(crate) async fn report_item_handler<I, R, N>(
    State(orchestrator): State<Arc<ResolutionOrchestrator<I, R, N>>>,
    Caller(owner): Caller,
    Json(report): Json<ItemReport>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    match orchestrator.report_item(&owner, report) {
        Ok(item) => (StatusCode::CREATED, Json(ItemView::from(&item))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn item_handler<I, R, N>(
    State(orchestrator): State<Arc<ResolutionOrchestrator<I, R, N>>>,
    Path(item_id): Path<String>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    match orchestrator.item(&ItemId(item_id)) {
        Ok(item) => (StatusCode::OK, Json(ItemView::from(&item))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submit_handler<I, R, N>(
    State(orchestrator): State<Arc<ResolutionOrchestrator<I, R, N>>>,
    Caller(responder): Caller,
    Path(item_id): Path<String>,
    Json(submission): Json<ResponseSubmission>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    match orchestrator.submit_response(&ItemId(item_id), &responder, submission) {
        Ok(record) => (StatusCode::CREATED, Json(ResponseView::from(&record))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn item_responses_handler<I, R, N>(
    State(orchestrator): State<Arc<ResolutionOrchestrator<I, R, N>>>,
    Path(item_id): Path<String>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    match orchestrator.list_responses(&ItemId(item_id)) {
        Ok(records) => {
            let views: Vec<ResponseView> = records.iter().map(ResponseView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn my_responses_handler<I, R, N>(
    State(orchestrator): State<Arc<ResolutionOrchestrator<I, R, N>>>,
    Caller(responder): Caller,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    match orchestrator.list_my_responses(&responder) {
        Ok(records) => {
            let views: Vec<ResponseView> = records.iter().map(ResponseView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn status_handler<I, R, N>(
    State(orchestrator): State<Arc<ResolutionOrchestrator<I, R, N>>>,
    Caller(requester): Caller,
    Path(response_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    N: NotificationGateway + 'static,
{
    let response_id = ResponseId(response_id);
    match orchestrator.set_response_status(&response_id, &requester, change.status) {
        Ok(record) => (StatusCode::OK, Json(ResponseView::from(&record))).into_response(),
        Err(error) => error.into_response(),
    }
}
