//! crypto-sage HTTP Server
//!
//! Axum-based REST API over the analysis engines, the tool registry and
//! the analyst chat pipeline.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::LlmProvider;
use agent_runtime::OllamaProvider;
use crypto_sage::{CryptoSage, LiveMarketData, MarketDataProvider, MockMarketData, SmcConfig};

use crate::handlers::{
    analyze_handler, chat_handler, execute_tool, health_check, list_tools, scenarios_handler,
    smc_handler,
};
use crate::state::AppState;

/// Market data source selected by `MARKET_DATA` (`live` or `mock`)
fn market_from_env() -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    let source = std::env::var("MARKET_DATA").unwrap_or_else(|_| "live".into());
    match source.trim().to_lowercase().as_str() {
        "live" => Ok(Arc::new(LiveMarketData::from_env()?)),
        "mock" => Ok(Arc::new(MockMarketData::new())),
        other => anyhow::bail!("MARKET_DATA must be 'live' or 'mock', got '{}'", other),
    }
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & tools
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}", post(execute_tool))
        // Engines
        .route("/api/scenarios", post(scenarios_handler))
        .route("/api/smc", post(smc_handler))
        .route("/api/analyze", post(analyze_handler))
        // Analyst
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ollama = OllamaProvider::from_env();
    let model = ollama.config().model.clone();
    let provider: Arc<dyn LlmProvider> = Arc::new(ollama);

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Ollama (model {})", model);
            if let Ok(models) = provider.list_models().await {
                for m in models {
                    tracing::info!("  Model: {}", m.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - chat will answer with apologies");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    let market = market_from_env()?;
    tracing::info!("Market data: {}", market.name());

    let sage = CryptoSage::new(provider.clone(), market).with_smc(SmcConfig::from_env())?;
    let state = AppState::new(provider, sage);

    tracing::info!("Registered {} tools:", state.tools.len());
    for name in state.tools.names() {
        tracing::info!("  • {}", name);
    }

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("crypto-sage server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health            - Health check");
    tracing::info!("  GET  /api/tools         - Tool declarations");
    tracing::info!("  POST /api/tools/{{name}}  - Execute a tool");
    tracing::info!("  POST /api/scenarios     - Classical scenarios for a snapshot");
    tracing::info!("  POST /api/smc           - SMC decision for candles");
    tracing::info!("  POST /api/analyze       - Full analysis for a coin");
    tracing::info!("  POST /api/chat          - Ask the analyst");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::provider::{Completion, GenerationOptions, ModelInfo, ProviderInfo};
    use agent_core::{AgentError, Message};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Provider that is always down
    struct OfflineProvider;

    #[async_trait]
    impl LlmProvider for OfflineProvider {
        async fn info(&self) -> agent_core::Result<ProviderInfo> {
            Err(AgentError::ProviderUnavailable("offline".into()))
        }

        async fn health_check(&self) -> agent_core::Result<bool> {
            Ok(false)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> agent_core::Result<Completion> {
            Err(AgentError::ProviderUnavailable("offline".into()))
        }

        async fn list_models(&self) -> agent_core::Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    fn app() -> Router {
        let provider: Arc<dyn LlmProvider> = Arc::new(OfflineProvider);
        let sage = CryptoSage::new(provider.clone(), Arc::new(MockMarketData::new()));
        router(AppState::new(provider, sage))
    }

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ollama_connected"], false);
        assert_eq!(body["market_data"], "MockMarketData");
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (status, body) = call("GET", "/api/tools", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["classical_scenarios", "get_crypto_analysis", "smc_analysis"]);
    }

    #[tokio::test]
    async fn test_execute_tool_errors() {
        let (status, body) = call("POST", "/api/tools/nope", Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "TOOL_NOT_FOUND");

        let (status, _) = call("POST", "/api/tools/classical_scenarios", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            "POST",
            "/api/tools/classical_scenarios",
            Some(json!({"current_price": 100.0, "sma50": 90.0, "sma200": 95.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["trend"], "bearish");
    }

    #[tokio::test]
    async fn test_scenarios_without_price_is_unknown() {
        let (status, body) = call("POST", "/api/scenarios", Some(json!({"sma50": 10.0}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trend"], "unknown");
        assert!(body["scenarios"].is_null());
    }

    #[tokio::test]
    async fn test_smc_endpoint() {
        let candles: Vec<Value> = (0..8)
            .map(|_| json!({"open": 50.0, "high": 51.0, "low": 49.0, "close": 50.0}))
            .collect();

        let (status, body) = call("POST", "/api/smc", Some(json!({"candles": candles}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "hold");

        let (status, body) = call("POST", "/api/smc", Some(json!({"candles": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_DATA");

        let (status, body) = call(
            "POST",
            "/api/smc",
            Some(json!({"candles": candles, "config": {"swing_length": 0}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_CONFIG");
    }

    #[tokio::test]
    async fn test_analyze_endpoint() {
        let (status, body) = call(
            "POST",
            "/api/analyze",
            Some(json!({"coin_id": "bitcoin", "symbol": "BTC", "interval": "4 hours"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_price"]["price"], 97_500.0);

        let (status, body) = call(
            "POST",
            "/api/analyze",
            Some(json!({"coin_id": "notacoin", "symbol": "NOPE"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNSUPPORTED_ASSET");
    }

    #[tokio::test]
    async fn test_chat_apologizes_when_llm_is_down() {
        let (status, body) = call("POST", "/api/chat", Some(json!({"message": "BTC?"}))).await;
        assert_eq!(status, StatusCode::OK);
        // Detection falls back to Arabic defaults
        assert!(body["message"].as_str().unwrap().starts_with("أعتذر"));

        let (status, _) = call("POST", "/api/chat", Some(json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
