use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use events::TranscriptSource;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Observer stream for one session: history batch, then live entries.
pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.registry.get(id)?;
    let source: Arc<dyn TranscriptSource + Send + Sync> = Arc::new(handle.transcript().clone());
    Ok(websocket::observe(ws, state.broadcaster().clone(), id, source))
}
