use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use arena_core::{Participant, SessionSnapshot, SessionStatus, TranscriptEntry};
use events::TranscriptSource;
use orchestrator::GameConfig;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Participant names; the configured roster is used when empty
    #[serde(default)]
    pub participants: Vec<String>,
    /// Overrides the server's game rules for this session
    #[serde(default)]
    pub game: Option<GameConfig>,
}

#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct WinnerResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    /// Empty until the game is over; two names for co-finalists
    pub winners: Vec<Participant>,
    /// Host recap of how the winners won; absent until the game is over
    pub takeaway: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TranscriptQuery {
    /// First sequence index to return
    #[serde(default)]
    pub from: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListSessionsQuery {
    /// Only return sessions in this status (pending, running, idle, completed, failed)
    #[serde(default)]
    pub status: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionSnapshot),
        (status = 400, description = "Invalid roster or rules")
    ),
    tag = "sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let names = if payload.participants.is_empty() {
        state.config.roster()
    } else {
        payload.participants
    };
    let game = payload.game.unwrap_or_else(|| state.config.game.clone());

    let seats = state.agents.seats(&names, game.seed);
    let handle = state.registry.create(game, seats)?;

    tracing::info!(
        session_id = %handle.id(),
        participants = names.len(),
        agents = state.agents.kind(),
        "Session registered"
    );
    Ok((StatusCode::CREATED, Json(handle.snapshot())))
}

#[utoipa::path(
    get,
    path = "/api/sessions",
    params(ListSessionsQuery),
    responses(
        (status = 200, description = "Sessions in creation order", body = Vec<SessionSnapshot>),
        (status = 400, description = "Unknown status filter")
    ),
    tag = "sessions"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Vec<SessionSnapshot>>, AppError> {
    let filter = query
        .status
        .as_deref()
        .map(str::parse::<SessionStatus>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let sessions = state
        .registry
        .list()
        .into_iter()
        .filter(|s| filter.as_ref().map_or(true, |status| &s.status == status))
        .collect();
    Ok(Json(sessions))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session found", body = SessionSnapshot),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = state.registry.get(id)?;
    Ok(Json(handle.snapshot()))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.registry.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/start",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 202, description = "Opening round started", body = SessionSnapshot),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already started or a round is running")
    ),
    tag = "sessions"
)]
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let handle = state.registry.get(id)?;

    if state.config.auto_advance {
        handle.spawn_play_out(state.config.round_delay())?;
    } else {
        handle.spawn_start()?;
    }

    tracing::info!(session_id = %id, auto_advance = state.config.auto_advance, "Session started");
    Ok((StatusCode::ACCEPTED, Json(handle.snapshot())))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/next-round",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 202, description = "Next round started", body = SessionSnapshot),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Not started, round running, failed or game over")
    ),
    tag = "sessions"
)]
pub async fn next_round(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let handle = state.registry.get(id)?;
    handle.spawn_advance()?;
    Ok((StatusCode::ACCEPTED, Json(handle.snapshot())))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/winner",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Winners and, after game over, the host takeaway", body = WinnerResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
pub async fn get_winner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WinnerResponse>, AppError> {
    let handle = state.registry.get(id)?;
    let takeaway = handle.takeaway(state.agents.recapper().as_ref()).await;
    let snapshot = handle.snapshot();
    Ok(Json(WinnerResponse {
        session_id: snapshot.id,
        status: snapshot.status,
        winners: snapshot.winners,
        takeaway,
    }))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/transcript",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        TranscriptQuery
    ),
    responses(
        (status = 200, description = "Transcript entries in order", body = Vec<TranscriptEntry>),
        (status = 404, description = "Session not found")
    ),
    tag = "sessions"
)]
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Json<Vec<TranscriptEntry>>, AppError> {
    let handle = state.registry.get(id)?;
    let entries = handle.transcript().entries_from(query.from.unwrap_or(0));
    Ok(Json(entries))
}
