use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::channel::ChatChannel;
use super::domain::{ChatMessage, MessageDraft};
use super::registry::ChannelSubscription;
use super::repository::MessageRepository;
use crate::auth::Caller;
use crate::workflows::claims::domain::{ResponseId, UserId};
use crate::workflows::claims::repository::{ItemRepository, ResponseRepository};

/// Router exposing chat history, posting, read receipts and the live WebSocket feed.
pub fn chat_router<I, R, M>(channel: Arc<ChatChannel<I, R, M>>) -> Router
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
{
    Router::new()
        .route("/api/chat/unread", get(unread_handler::<I, R, M>))
        .route(
            "/api/chat/:response_id",
            get(open_handler::<I, R, M>).post(post_handler::<I, R, M>),
        )
        .route("/api/chat/:response_id/read", put(read_handler::<I, R, M>))
        .route("/api/chat/:response_id/ws", get(socket_handler::<I, R, M>))
        .with_state(channel)
}

/// Frames pushed to WebSocket clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelEvent {
    History { messages: Vec<ChatMessage> },
    Message { message: ChatMessage },
    Error { error: String },
}

pub(crate) async fn open_handler<I, R, M>(
    State(channel): State<Arc<ChatChannel<I, R, M>>>,
    Caller(user): Caller,
    Path(response_id): Path<String>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
{
    match channel.open_channel(&ResponseId(response_id), &user) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn post_handler<I, R, M>(
    State(channel): State<Arc<ChatChannel<I, R, M>>>,
    Caller(sender): Caller,
    Path(response_id): Path<String>,
    Json(draft): Json<MessageDraft>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
{
    match channel.post_message(&ResponseId(response_id), &sender, &draft.content) {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn read_handler<I, R, M>(
    State(channel): State<Arc<ChatChannel<I, R, M>>>,
    Caller(user): Caller,
    Path(response_id): Path<String>,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
{
    match channel.mark_read(&ResponseId(response_id), &user) {
        Ok(updated) => (StatusCode::OK, Json(json!({ "updated": updated }))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn unread_handler<I, R, M>(
    State(channel): State<Arc<ChatChannel<I, R, M>>>,
    Caller(user): Caller,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
{
    match channel.unread_count(&user) {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn socket_handler<I, R, M>(
    State(channel): State<Arc<ChatChannel<I, R, M>>>,
    Caller(user): Caller,
    Path(response_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response
where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
{
    let response_id = ResponseId(response_id);
    // Subscribe before reading history so nothing posted in between is lost.
    let subscription = match channel.subscribe(&response_id, &user) {
        Ok(subscription) => subscription,
        Err(error) => return error.into_response(),
    };
    let history = match channel.list_messages(&response_id, &user) {
        Ok(history) => history,
        Err(error) => return error.into_response(),
    };

    ws.on_upgrade(move |socket: WebSocket| {
        let (sender, receiver) = socket.split();
        stream_channel(sender, receiver, channel, subscription, history, user)
    })
}

/// Pump one client connection: the history frame, then live messages not already in it,
/// while text frames from the client are posted to the channel.
pub(crate) async fn stream_channel<I, R, M, Tx, Rx>(
    mut sender: Tx,
    mut receiver: Rx,
    channel: Arc<ChatChannel<I, R, M>>,
    mut subscription: ChannelSubscription,
    history: Vec<ChatMessage>,
    user: UserId,
) where
    I: ItemRepository + 'static,
    R: ResponseRepository + 'static,
    M: MessageRepository + 'static,
    Tx: Sink<Message, Error = axum::Error> + Unpin,
    Rx: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let response_id = subscription.channel().clone();

    let mut last_sequence = history.last().map(|message| message.sequence).unwrap_or(0);
    if send_event(&mut sender, &ChannelEvent::History { messages: history })
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            published = subscription.next() => {
                let Some(message) = published else { break };
                if message.sequence <= last_sequence {
                    continue;
                }
                last_sequence = message.sequence;
                if send_event(&mut sender, &ChannelEvent::Message { message }).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(content))) => {
                        // Posting publishes back to this socket through the subscription.
                        if let Err(error) = channel.post_message(&response_id, &user, &content) {
                            let event = ChannelEvent::Error { error: error.to_string() };
                            if send_event(&mut sender, &event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(response_id = %response_id.0, %error, "chat socket receive error");
                        break;
                    }
                }
            }
        }
    }

    debug!(response_id = %response_id.0, user = %user.0, "chat socket closed");
}

async fn send_event<S>(sender: &mut S, event: &ChannelEvent) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(%error, "failed to encode chat event");
            return Ok(());
        }
    };
    sender.send(Message::Text(payload)).await
}
