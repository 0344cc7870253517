mod config;
mod error;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use checker::{CheckerConfig, Evaluation, EvaluationInput, Pipeline, PreparedEvaluation, Preview};
use extract::{Oracle, OracleClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::error::ApiError;

struct AppState {
    pipeline: Pipeline,
    oracle: Option<OracleClient>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    /// Model name of the configured oracle, if any
    oracle: Option<String>,
}

#[derive(Deserialize)]
struct EvaluateRequest {
    row: String,
    #[serde(default)]
    url_override: Option<String>,
    #[serde(default)]
    upload_base64: Option<String>,
}

impl EvaluateRequest {
    fn into_input(self) -> Result<EvaluationInput, ApiError> {
        let upload = match self.upload_base64.as_deref().map(str::trim) {
            Some(encoded) if !encoded.is_empty() => {
                Some(BASE64.decode(encoded).map_err(ApiError::bad_upload)?)
            }
            _ => None,
        };

        Ok(EvaluationInput {
            row: self.row,
            url_override: self.url_override,
            upload,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server = ServerConfig::from_env()?;
    init_tracing(server.json_logs);

    let config = CheckerConfig::load(None)?;
    let oracle = OracleClient::from_config(&config.oracle)?;
    match &oracle {
        Some(oracle) => info!(oracle = oracle.name(), "Oracle configured"),
        None => warn!("No oracle configured; /evaluate will answer 503"),
    }

    let pipeline = Pipeline::new(config)?;
    let state = Arc::new(AppState { pipeline, oracle });
    let app = router(state, server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", server.bind))?;

    info!("Server listening on http://{}", server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/preview", post(preview))
        .route("/excerpt", post(excerpt))
        .route("/evaluate", post(evaluate))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        oracle: state.oracle.as_ref().map(|o| o.name().to_string()),
    })
}

async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<Preview>, ApiError> {
    let input = req.into_input()?;
    Ok(Json(state.pipeline.preview(&input)))
}

async fn excerpt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<PreparedEvaluation>, ApiError> {
    let input = req.into_input()?;

    match state.pipeline.prepare(&input).await {
        Ok(prepared) => Ok(Json(prepared)),
        Err(e) => {
            warn!(cause = e.cause(), error = %e, "Excerpt failed");
            Err(e.into())
        }
    }
}

async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<Evaluation>, ApiError> {
    let input = req.into_input()?;

    match state.pipeline.evaluate(&input, state.oracle.as_ref()).await {
        Ok(evaluation) => Ok(Json(evaluation)),
        Err(e) => {
            warn!(cause = e.cause(), error = %e, "Evaluation failed");
            Err(e.into())
        }
    }
}
