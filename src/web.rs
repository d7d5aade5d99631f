use crate::{
    compose::{CandidateList, Composer},
    dictionary::DefinitionLookup,
    quiz::{QuizBank, QuizQuestion},
    render::{self, InlineResult, LinkOptions},
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
pub struct SharedState {
    pub composer: Composer,
    pub dictionary: Arc<dyn DefinitionLookup>,
    pub quiz: Option<Arc<QuizBank>>,
    pub links: LinkOptions,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/candidates", post(candidates))
        .route("/api/inline", post(inline))
        .route("/api/quiz", get(random_question))
        .route("/api/quiz/:id", get(question))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(Arc::new(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => log::warn!("received Ctrl+C, shutting down"),
        _ = terminate => log::warn!("received SIGTERM, shutting down"),
    }
}

async fn start_app(listen: &str, state: SharedState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(listen: &str, state: SharedState) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(listen, state).await })
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("quiz is not configured")]
    QuizDisabled,

    #[error("quiz has no questions")]
    QuizEmpty,

    #[error("question {0} not found")]
    QuestionNotFound(u32),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug)]
struct HttpError(ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            ApiError::QuestionNotFound(_) => (
                axum::http::StatusCode::NOT_FOUND,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            ApiError::QuizDisabled | ApiError::QuizEmpty => (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            ApiError::Join(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub model: String,
    pub dimensions: usize,
    pub entries: usize,
}

async fn health(State(state): State<Arc<SharedState>>) -> Json<HealthResponse> {
    let engine = state.composer.engine();

    Json(HealthResponse {
        model: engine.model_name().to_string(),
        dimensions: engine.index().dimensions(),
        entries: engine.index().len(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

async fn candidates(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<CandidateList>, HttpError> {
    log::debug!("payload: {payload:?}");

    let composer = state.composer.clone();
    let list = tokio::task::spawn_blocking(move || composer.compose(&payload.query)).await?;

    Ok(Json(list))
}

async fn inline(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<Vec<InlineResult>>, HttpError> {
    log::debug!("payload: {payload:?}");

    let results = tokio::task::spawn_blocking(move || {
        let candidates = state.composer.compose(&payload.query);
        render::render_candidates(&candidates, state.dictionary.as_ref(), &state.links)
    })
    .await?;

    Ok(Json(results))
}

async fn random_question(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<QuizQuestion>, HttpError> {
    let quiz = state.quiz.as_ref().ok_or(ApiError::QuizDisabled)?;

    quiz.random(&mut rand::rng())
        .cloned()
        .map(Json)
        .ok_or(ApiError::QuizEmpty.into())
}

async fn question(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<u32>,
) -> Result<Json<QuizQuestion>, HttpError> {
    let quiz = state.quiz.as_ref().ok_or(ApiError::QuizDisabled)?;

    quiz.get(id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::QuestionNotFound(id).into())
}
