//! Caller identity supplied by the upstream authentication layer.
//!
//! The gateway in front of this service authenticates the user and forwards the id in the
//! `x-user-id` header. The value is trusted as-is.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::workflows::claims::domain::UserId;

pub const CALLER_HEADER: &str = "x-user-id";

/// Authenticated caller extracted from the request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

/// Rejection returned when no caller identity is present.
#[derive(Debug)]
pub struct MissingCaller;

impl IntoResponse for MissingCaller {
    fn into_response(self) -> Response {
        let payload = json!({ "error": "missing authenticated caller" });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = MissingCaller;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Caller(UserId(value.to_string())))
            .ok_or(MissingCaller)
    }
}
