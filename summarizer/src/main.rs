mod gemini;
mod prompt;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crossai_types::{SummaryRequest, SummaryResponse};
use std::env;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const ALLOWED_ORIGINS: &[&str] = &[
    "https://chatgpt.com",
    "https://gemini.google.com",
    "https://claude.ai",
    "http://localhost",
    "http://localhost:8000",
    "http://127.0.0.1:8000",
];

/// Where summaries come from. Echo hands the conversation back unchanged,
/// which keeps the extension usable without an API key.
#[derive(Clone)]
enum Backend {
    Gemini(gemini::GeminiClient),
    Echo,
}

#[derive(Clone)]
struct AppState {
    backend: Arc<Backend>,
}

#[derive(Debug)]
struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = format!("error: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let backend = match gemini::GeminiClient::from_env()? {
        Some(client) => {
            tracing::info!(model = client.model(), "using Gemini backend");
            Backend::Gemini(client)
        }
        None => {
            tracing::warn!("GOOGLE_GEMINI_API_KEY not set; summaries will echo their input");
            Backend::Echo
        }
    };

    let app = router(AppState {
        backend: Arc::new(backend),
    });

    let bind_addr = env::var("SUMMARIZER_BIND").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    tracing::info!("CrossAI summarizer listening on http://{bind_addr}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/generate_echo", post(generate))
        .with_state(state)
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

fn cors() -> CorsLayer {
    let origins = ALLOWED_ORIGINS
        .iter()
        .map(|o| HeaderValue::from_static(o));
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn generate(
    State(state): State<AppState>,
    Json(body): Json<SummaryRequest>,
) -> ApiResult<Json<SummaryResponse>> {
    let started = Instant::now();
    tracing::debug!(chars = body.text.chars().count(), "summary requested");

    let result = match state.backend.as_ref() {
        Backend::Gemini(client) => client
            .generate(&prompt::handoff_prompt(&body.text))
            .await
            .map_err(|e| ApiError(e.context("generate summary")))?,
        Backend::Echo => body.text,
    };

    tracing::info!(
        latency_ms = started.elapsed().as_millis() as u64,
        "generate_echo latency"
    );
    Ok(Json(SummaryResponse { result }))
}
