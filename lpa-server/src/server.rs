use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use lpa_rag::{Answer, FALLBACK_ANSWER};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info};

use crate::protocol::{ApiError, AskRequest, AskResponse, INVALID_BODY_MESSAGE};
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind `config.host:config.port` and serve until the process stops.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", config.host, config.port))?;

    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    serve(listener, state).await
}

/// Serve the router on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!("loan product assistant listening on http://{}", addr);
    axum::serve(listener, app_router(state)).await.context("server terminated")?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok"}))
}

async fn ask(
    State(state): State<AppState>,
    request: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = request.map_err(|rejection| {
        debug!(status = %rejection.status(), error = %rejection.body_text(), "rejected ask body");
        ApiError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    })?;
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let assembler = state.assembler().await.map_err(|e| {
        error!(error = %e, "index unavailable for request");
        ApiError::Internal
    })?;
    let answer = assembler.answer(question).await.map_err(|e| {
        error!(error = %e, "failed to answer question");
        ApiError::Internal
    })?;

    let response = match answer {
        Answer::Grounded { text, sources } => AskResponse { answer: text, grounded: true, sources },
        Answer::NoRelevantContext => AskResponse {
            answer: FALLBACK_ANSWER.to_string(),
            grounded: false,
            sources: Vec::new(),
        },
    };
    Ok(Json(response))
}
