//! Application State

use std::sync::Arc;

use agent_core::{LlmProvider, ToolRegistry};
use crypto_sage::CryptoSage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Ollama, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Analysis pipeline, also backing the analysis tools
    pub sage: Arc<CryptoSage>,

    /// Tool registry with all available tools
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    /// Wire the pipeline and register its tools
    pub fn new(provider: Arc<dyn LlmProvider>, sage: CryptoSage) -> Self {
        let sage = Arc::new(sage);
        let mut tools = ToolRegistry::new();
        crypto_sage::register_tools(&mut tools, sage.clone());

        Self {
            provider,
            sage,
            tools: Arc::new(tools),
        }
    }
}
