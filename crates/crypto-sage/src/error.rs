//! Error Types for Crypto Sage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SageError>;

#[derive(Error, Debug)]
pub enum SageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: need {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Unsupported interval '{0}'")]
    UnsupportedInterval(String),

    #[error("Asset not supported: {0}")]
    UnsupportedAsset(String),

    #[error("Market data provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(#[from] agent_core::AgentError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SageError {
    /// Short machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            SageError::InvalidInput(_) => "INVALID_INPUT",
            SageError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            SageError::UnsupportedInterval(_) => "UNSUPPORTED_INTERVAL",
            SageError::UnsupportedAsset(_) => "UNSUPPORTED_ASSET",
            SageError::Provider(_) | SageError::Network(_) => "MARKET_DATA_ERROR",
            SageError::Config(_) => "CONFIG_ERROR",
            SageError::Agent(_) => "AGENT_ERROR",
            SageError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the caller supplied bad input (as opposed to a collaborator failing)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SageError::InvalidInput(_)
                | SageError::InsufficientData { .. }
                | SageError::UnsupportedInterval(_)
                | SageError::UnsupportedAsset(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            SageError::InvalidInput(msg) => format!("Invalid request: {}", msg),
            SageError::InsufficientData { required, actual } => format!(
                "Not enough price history to analyze ({} of {} candles).",
                actual, required
            ),
            SageError::UnsupportedInterval(label) => format!(
                "The interval '{}' is not supported. Try '1 day' or '4 hours'.",
                label
            ),
            SageError::UnsupportedAsset(symbol) => format!("The coin '{}' is not supported.", symbol),
            SageError::Provider(_) | SageError::Network(_) => {
                "Market data is temporarily unavailable. Please try again.".into()
            }
            SageError::Agent(e) => e.user_message(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}
