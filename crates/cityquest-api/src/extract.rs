//! Request extractors for the acting user and the client platform.

use std::convert::Infallible;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use cityquest_core::platform::Platform;
use cityquest_platform::APP_PLATFORM_HEADER;
use uuid::Uuid;

use crate::error::ErrorBody;

/// Header carrying the already-authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

/// Rejection for a missing or malformed user id header.
#[derive(Debug)]
pub struct Unauthorized(&'static str);

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: "unauthorized",
            message: self.0.to_owned(),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(Unauthorized("missing X-User-Id header"))?;
        raw.to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(Self)
            .ok_or(Unauthorized("X-User-Id must be a UUID"))
    }
}

/// The platform the request came from, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPlatform(pub Platform);

impl<S: Send + Sync> FromRequestParts<S> for ClientPlatform {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
        };
        Ok(Self(cityquest_platform::resolve(
            header(USER_AGENT.as_str()),
            header(APP_PLATFORM_HEADER),
        )))
    }
}
