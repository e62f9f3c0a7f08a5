//! HTTP routes.
//!
//! Serves:
//! - `GET  /`                   : liveness and endpoint listing
//! - `POST /api/solve/single`   : single-agent baseline
//! - `POST /api/solve/multi`    : proposer/critic debate
//! - `GET  /api/sample-problems`: demo catalog

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use coordination::{
    ChatCompletionsCaller, DebateOrchestrator, ModelCaller, RuleBasedSolver, SmallModelSolver,
    SolveResult, Solver,
};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{usable_key, ServerConfig, SingleMode};
use crate::error::ApiError;
use crate::samples::SAMPLE_PROBLEMS;

/// Builds model callers for a request's credential.
pub trait CallerFactory: Send + Sync {
    /// Caller for both debate roles.
    fn debate_caller(&self, api_key: &str) -> Arc<dyn ModelCaller>;

    /// Caller for the small-model baseline.
    fn small_model_caller(&self, api_key: &str) -> Arc<dyn ModelCaller>;
}

/// Chat-completions callers sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpCallerFactory {
    client: reqwest::Client,
    openai_url: String,
    huggingface_url: String,
    timeout: Duration,
}

impl HttpCallerFactory {
    pub fn from_config(config: &ServerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            openai_url: config.openai.url.clone(),
            huggingface_url: config.huggingface.url.clone(),
            timeout: config.timeout(),
        })
    }
}

impl CallerFactory for HttpCallerFactory {
    fn debate_caller(&self, api_key: &str) -> Arc<dyn ModelCaller> {
        Arc::new(ChatCompletionsCaller::with_client(
            self.client.clone(),
            &self.openai_url,
            api_key,
            self.timeout,
        ))
    }

    fn small_model_caller(&self, api_key: &str) -> Arc<dyn ModelCaller> {
        Arc::new(ChatCompletionsCaller::with_client(
            self.client.clone(),
            &self.huggingface_url,
            api_key,
            self.timeout,
        ))
    }
}

/// Shared state for the solver API.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub callers: Arc<dyn CallerFactory>,
}

impl AppState {
    pub fn new(config: ServerConfig, callers: Arc<dyn CallerFactory>) -> Self {
        Self {
            config: Arc::new(config),
            callers,
        }
    }
}

/// Body of both solve endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ProblemRequest {
    pub problem: String,
    /// Caller-supplied OpenAI key; only read by the multi-agent route.
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

/// Build the axum router for the solver API.
pub fn build_router(state: AppState) -> Router {
    let origin = if state.config.allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<_> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/api/solve/single", post(solve_single))
        .route("/api/solve/multi", post(solve_multi))
        .route("/api/sample-problems", get(sample_problems))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "message": "Multi-Agent Demo API",
        "endpoints": {
            "single_agent": "/api/solve/single",
            "multi_agent": "/api/solve/multi",
            "sample_problems": "/api/sample-problems"
        }
    }))
}

async fn solve_single(
    State(state): State<AppState>,
    payload: Result<Json<ProblemRequest>, JsonRejection>,
) -> Result<Json<SolveResult>, ApiError> {
    let Json(request) = payload?;
    let config = &state.config;

    let solver: Box<dyn Solver> = match config.single_mode {
        SingleMode::RuleBased => Box::new(RuleBasedSolver::new(config.debate.timestamps)),
        SingleMode::SmallModel => {
            let key = config.huggingface.usable_key().ok_or_else(|| {
                ApiError::NotConfigured(
                    "HUGGINGFACE_API_KEY not configured. Please set it in the .env file on the server."
                        .into(),
                )
            })?;
            let caller = state.callers.small_model_caller(key);
            Box::new(SmallModelSolver::with_settings(caller, config.small_model.clone()))
        }
    };

    let result = solver.solve(&request.problem).await;
    info!(
        solver = solver.name(),
        success = result.success,
        final_answer = %result.final_answer,
        steps = result.total_steps,
        "single solve finished"
    );
    Ok(Json(result))
}

async fn solve_multi(
    State(state): State<AppState>,
    payload: Result<Json<ProblemRequest>, JsonRejection>,
) -> Result<Json<SolveResult>, ApiError> {
    let Json(request) = payload?;
    let config = &state.config;

    let key = usable_key(request.openai_api_key.as_deref())
        .or_else(|| config.openai.usable_key())
        .ok_or_else(|| {
            ApiError::BadRequest(
                "OpenAI API key required: send openai_api_key or set OPENAI_API_KEY on the server."
                    .into(),
            )
        })?;

    let caller = state.callers.debate_caller(key);
    let outcome = DebateOrchestrator::with_config(caller, config.debate.clone())
        .run(&request.problem)
        .await;
    info!(solve_id = %outcome.solve_id, "{}", outcome.summary_line());
    Ok(Json(outcome.result))
}

async fn sample_problems() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "problems": SAMPLE_PROBLEMS }))
}
