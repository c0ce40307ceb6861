pub mod agents;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Arena API",
        version = "0.1.0",
        description = "Control surface for arena elimination sessions"
    ),
    paths(
        routes::health_check,
        routes::create_session,
        routes::list_sessions,
        routes::get_session,
        routes::delete_session,
        routes::start_session,
        routes::next_round,
        routes::get_winner,
        routes::get_transcript,
    ),
    components(schemas(
        routes::HealthResponse,
        routes::CreateSessionRequest,
        routes::WinnerResponse,
        error::ErrorResponse,
        arena_core::Participant,
        arena_core::RoundPhase,
        arena_core::SessionStatus,
        arena_core::SessionSnapshot,
        arena_core::EntryKind,
        arena_core::TranscriptEntry,
        orchestrator::GameConfig,
        orchestrator::ExitRule,
        orchestrator::VoteResolutionPolicy,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Session lifecycle and transcript endpoints"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health_check))
        .route(
            "/api/sessions",
            get(routes::list_sessions).post(routes::create_session),
        )
        .route(
            "/api/sessions/{id}",
            get(routes::get_session).delete(routes::delete_session),
        )
        .route("/api/sessions/{id}/start", post(routes::start_session))
        .route("/api/sessions/{id}/next-round", post(routes::next_round))
        .route("/api/sessions/{id}/winner", get(routes::get_winner))
        .route("/api/sessions/{id}/transcript", get(routes::get_transcript))
        .route("/api/sessions/{id}/ws", get(routes::session_ws))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `port` on all interfaces and serve until the process stops.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
