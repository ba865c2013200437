//! Routes for quest likes.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use cityquest_progress::application::command_handlers::{self, LikeResult};
use cityquest_progress::application::query_handlers;
use cityquest_progress::domain::commands;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ClientPlatform, CurrentUser};
use crate::state::AppState;

/// Response body for GET /{quest_id}/like.
#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    /// The user has progress on the quest in some status.
    pub can_like: bool,
    /// The user currently likes the quest.
    pub is_liked: bool,
}

/// POST /{quest_id}/like
#[instrument(skip(state, platform), fields(user_id = %user_id, quest_id = %quest_id))]
async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ClientPlatform(platform): ClientPlatform,
    Path(quest_id): Path<Uuid>,
) -> Result<Json<LikeResult>, ApiError> {
    let command = commands::ToggleLike {
        correlation_id: Uuid::new_v4(),
        user_id,
        quest_id,
        platform,
    };

    info!(correlation_id = %command.correlation_id, "handling toggle_like command");

    let result = command_handlers::handle_toggle_like(&command, state.ports()).await?;

    Ok(Json(result))
}

/// GET /{quest_id}/like
#[instrument(skip(state), fields(user_id = %user_id, quest_id = %quest_id))]
async fn like_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(quest_id): Path<Uuid>,
) -> Result<Json<LikeStatusResponse>, ApiError> {
    let can_like = query_handlers::can_like(user_id, quest_id, state.progress.as_ref()).await?;
    let is_liked = query_handlers::is_liked(user_id, quest_id, state.progress.as_ref()).await?;
    Ok(Json(LikeStatusResponse { can_like, is_liked }))
}

/// Returns the router for quest likes.
pub fn router() -> Router<AppState> {
    Router::new().route("/{quest_id}/like", get(like_status).post(toggle_like))
}
