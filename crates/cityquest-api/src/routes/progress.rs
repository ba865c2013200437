//! Routes for the Quest Progress bounded context.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use cityquest_core::error::DomainError;
use cityquest_core::event::DomainEvent;
use cityquest_core::platform::Platform;
use cityquest_core::repository::{ProgressFilter, ProgressRecord};
use cityquest_core::status::QuestStatus;
use cityquest_progress::application::command_handlers::{self, ProgressCommandResult};
use cityquest_progress::application::query_handlers::{
    self, ProgressEntryView, UserProgressView,
};
use cityquest_progress::domain::commands;
use cityquest_progress::domain::events::ProgressEvent;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ClientPlatform, CurrentUser};
use crate::state::AppState;

/// Query string for GET /.
#[derive(Debug, Default, Deserialize)]
pub struct ListProgressQuery {
    /// One of `active`, `paused`, `completed`.
    pub status: Option<String>,
    /// `true` or `false`; anything else is ignored.
    pub liked: Option<String>,
}

impl ListProgressQuery {
    fn into_filter(self) -> Result<ProgressFilter, DomainError> {
        let status = match self.status.as_deref() {
            None => None,
            Some(raw @ ("active" | "paused" | "completed")) => Some(raw.parse::<QuestStatus>()?),
            Some(other) => {
                return Err(DomainError::Validation(format!(
                    "invalid status \"{other}\"; must be one of: active, paused, completed"
                )));
            }
        };
        let liked = match self.liked.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };
        Ok(ProgressFilter { status, liked })
    }
}

/// Request body for POST /{quest_id}/step-checks.
#[derive(Debug, Deserialize)]
pub struct StepCheckRequest {
    /// Latitude reported by the client.
    pub client_latitude: f64,
    /// Longitude reported by the client.
    pub client_longitude: f64,
    /// Distance to the step's point, in metres.
    pub distance_to_point: f64,
    /// Whether the step's conditions were met.
    pub check_passed: bool,
}

/// Response body returned after a progress command is handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The progress aggregate that changed.
    pub aggregate_id: Uuid,
    /// The snapshot after the change.
    pub data: Option<ProgressRecord>,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

impl From<ProgressCommandResult> for CommandResponse {
    fn from(result: ProgressCommandResult) -> Self {
        Self {
            aggregate_id: result.aggregate_id,
            data: result.progress,
            event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
        }
    }
}

/// Response body for GET /active.
#[derive(Debug, Serialize)]
pub struct ActiveQuestResponse {
    /// The active entry, or `null`.
    pub data: Option<ProgressEntryView>,
}

/// Response body for GET /liked.
#[derive(Debug, Serialize)]
pub struct LikedQuestsResponse {
    /// Liked entries, newest first.
    pub data: Vec<ProgressEntryView>,
}

/// One entry of the progress history.
#[derive(Debug, Serialize)]
pub struct EventView {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Event type discriminator.
    pub event_type: &'static str,
    /// The progress aggregate.
    pub aggregate_id: Uuid,
    /// The quest.
    pub quest_id: Uuid,
    /// Kind-specific payload.
    pub event_data: serde_json::Value,
    /// Client platform.
    pub platform: Option<Platform>,
    /// Correlation ID of the originating command.
    pub correlation_id: Uuid,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

impl From<&ProgressEvent> for EventView {
    fn from(event: &ProgressEvent) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            event_type: event.event_type(),
            aggregate_id: meta.aggregate_id,
            quest_id: meta.quest_id,
            event_data: event.event_data(),
            platform: event.platform().cloned(),
            correlation_id: meta.correlation_id,
            occurred_at: meta.occurred_at,
        }
    }
}

/// Response body for GET /events.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    /// The user's progress events, oldest first.
    pub data: Vec<EventView>,
}

/// GET /
#[instrument(skip(state, query), fields(user_id = %user_id))]
async fn list_progress(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListProgressQuery>,
) -> Result<Json<UserProgressView>, ApiError> {
    let filter = query.into_filter()?;
    let view = query_handlers::get_user_progress(
        user_id,
        filter,
        state.quests.as_ref(),
        state.progress.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// GET /active
#[instrument(skip(state), fields(user_id = %user_id))]
async fn active_quest(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ActiveQuestResponse>, ApiError> {
    let data =
        query_handlers::get_active_quest(user_id, state.quests.as_ref(), state.progress.as_ref())
            .await?;
    Ok(Json(ActiveQuestResponse { data }))
}

/// GET /liked
#[instrument(skip(state), fields(user_id = %user_id))]
async fn liked_quests(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<LikedQuestsResponse>, ApiError> {
    let data =
        query_handlers::get_liked_quests(user_id, state.quests.as_ref(), state.progress.as_ref())
            .await?;
    Ok(Json(LikedQuestsResponse { data }))
}

/// GET /events
#[instrument(skip(state), fields(user_id = %user_id))]
async fn user_events(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = query_handlers::get_events_by_user_id(user_id, state.event_store.as_ref()).await?;
    Ok(Json(EventsResponse {
        data: events.iter().map(EventView::from).collect(),
    }))
}

/// POST /{quest_id}/start
#[instrument(skip(state, platform), fields(user_id = %user_id, quest_id = %quest_id))]
async fn start_quest(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ClientPlatform(platform): ClientPlatform,
    Path(quest_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::StartQuest {
        correlation_id: Uuid::new_v4(),
        user_id,
        quest_id,
        platform,
    };

    info!(correlation_id = %command.correlation_id, "handling start_quest command");

    let result =
        command_handlers::handle_start_quest(&command, state.clock.as_ref(), state.ports()).await?;

    Ok((StatusCode::CREATED, Json(result.into())))
}

/// POST /{quest_id}/pause
#[instrument(skip(state, platform), fields(user_id = %user_id, quest_id = %quest_id))]
async fn pause_quest(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ClientPlatform(platform): ClientPlatform,
    Path(quest_id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::PauseQuest {
        correlation_id: Uuid::new_v4(),
        user_id,
        quest_id,
        platform,
    };

    info!(correlation_id = %command.correlation_id, "handling pause_quest command");

    let result =
        command_handlers::handle_pause_quest(&command, state.clock.as_ref(), state.ports()).await?;

    Ok(Json(result.into()))
}

/// POST /{quest_id}/complete
#[instrument(skip(state, platform), fields(user_id = %user_id, quest_id = %quest_id))]
async fn complete_quest(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ClientPlatform(platform): ClientPlatform,
    Path(quest_id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::CompleteQuest {
        correlation_id: Uuid::new_v4(),
        user_id,
        quest_id,
        platform,
    };

    info!(correlation_id = %command.correlation_id, "handling complete_quest command");

    let result =
        command_handlers::handle_complete_quest(&command, state.clock.as_ref(), state.ports())
            .await?;

    Ok(Json(result.into()))
}

/// POST /{quest_id}/abandon
#[instrument(skip(state, platform), fields(user_id = %user_id, quest_id = %quest_id))]
async fn abandon_quest(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ClientPlatform(platform): ClientPlatform,
    Path(quest_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::AbandonQuest {
        correlation_id: Uuid::new_v4(),
        user_id,
        quest_id,
        platform,
    };

    info!(correlation_id = %command.correlation_id, "handling abandon_quest command");

    command_handlers::handle_abandon_quest(&command, state.clock.as_ref(), state.ports()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /{quest_id}/step-checks
#[instrument(skip(state, platform, request), fields(user_id = %user_id, quest_id = %quest_id))]
async fn record_step_check(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ClientPlatform(platform): ClientPlatform,
    Path(quest_id): Path<Uuid>,
    Json(request): Json<StepCheckRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::RecordStepCheck {
        correlation_id: Uuid::new_v4(),
        user_id,
        quest_id,
        client_latitude: request.client_latitude,
        client_longitude: request.client_longitude,
        distance_to_point: request.distance_to_point,
        check_passed: request.check_passed,
        platform,
    };

    info!(correlation_id = %command.correlation_id, "handling record_step_check command");

    let result =
        command_handlers::handle_record_step_check(&command, state.clock.as_ref(), state.ports())
            .await?;

    Ok(Json(result.into()))
}

/// Returns the router for the progress context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_progress))
        .route("/active", get(active_quest))
        .route("/liked", get(liked_quests))
        .route("/events", get(user_events))
        .route("/{quest_id}/start", post(start_quest))
        .route("/{quest_id}/pause", post(pause_quest))
        .route("/{quest_id}/complete", post(complete_quest))
        .route("/{quest_id}/abandon", post(abandon_quest))
        .route("/{quest_id}/step-checks", post(record_step_check))
}
