//! HTTP Handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agent_core::{AgentError, ToolCall, ToolResult};
use crypto_sage::{
    strategy::smc::PrecomputedPatterns, AnalysisReport, Candle, ClassicalAnalysis, Decision,
    Interval, MarketSnapshot, OhlcSeries, SageError, SmcAnalyzer, SmcConfig,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
    pub market_data: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Telegram MarkdownV2 text
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SmcRequest {
    pub candles: Vec<Candle>,
    #[serde(default)]
    pub config: Option<SmcConfig>,
    /// Pattern stages to use instead of detecting them
    #[serde(default)]
    pub patterns: PrecomputedPatterns,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub coin_id: String,
    pub symbol: String,
    #[serde(default)]
    pub interval: Interval,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn sage_error(err: SageError) -> ApiError {
    let status = match &err {
        SageError::UnsupportedAsset(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        SageError::Provider(_) | SageError::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("request failed: {}", err);
    }
    api_error(status, err.code(), err.user_message())
}

fn agent_error(err: AgentError) -> ApiError {
    let (status, code) = match &err {
        AgentError::ToolNotFound(_) => (StatusCode::NOT_FOUND, "TOOL_NOT_FOUND"),
        AgentError::ToolValidation(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENTS"),
        AgentError::ToolTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TOOL_TIMEOUT"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "TOOL_ERROR"),
    };
    if status.is_server_error() {
        tracing::error!("tool failed: {}", err);
    }
    api_error(status, code, err.user_message())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
        market_data: state.sage.market().name().to_string(),
    })
}

/// Function-calling declarations of every registered tool
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(state.tools.schemas().iter().map(|s| s.to_function()).collect())
}

/// Execute one tool with a JSON object of arguments
pub async fn execute_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(arguments): Json<HashMap<String, Value>>,
) -> Result<Json<ToolResult>, ApiError> {
    let call = ToolCall {
        name,
        arguments,
        id: None,
    };
    state.tools.execute(&call).await.map(Json).map_err(agent_error)
}

/// Classical scenarios for a caller-supplied snapshot
pub async fn scenarios_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<MarketSnapshot>,
) -> Json<ClassicalAnalysis> {
    Json(state.sage.classical_analyst().derive_scenarios(&snapshot))
}

/// SMC decision for caller-supplied candles
pub async fn smc_handler(
    State(state): State<AppState>,
    Json(payload): Json<SmcRequest>,
) -> Result<Json<Decision>, ApiError> {
    let series = OhlcSeries::new(payload.candles);
    series.validate().map_err(sage_error)?;

    let custom;
    let analyzer = match payload.config {
        Some(config) => {
            custom = SmcAnalyzer::new(config).map_err(|e| {
                api_error(StatusCode::BAD_REQUEST, "INVALID_CONFIG", e.to_string())
            })?;
            &custom
        }
        None => state.sage.smc_analyzer(),
    };

    analyzer
        .analyze_with(&series, payload.patterns)
        .map(Json)
        .map_err(sage_error)
}

/// Full market analysis for one coin
pub async fn analyze_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    state
        .sage
        .analyze(&payload.coin_id, &payload.symbol, payload.interval)
        .await
        .map(Json)
        .map_err(sage_error)
}

/// Free-text question answered by the analyst
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let text = payload.message.trim();
    if text.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "EMPTY_MESSAGE", "message is empty"));
    }

    let message = state.sage.process_query(text).await;
    Ok(Json(ChatResponse { message }))
}
