//! Coin Intent Detection
//!
//! Turns a free-text request ("تحليل البيتكوين على 4 ساعات", "ETH weekly
//! outlook") into the coin, interval and reply language the pipeline needs.

use std::sync::Arc;

use agent_core::{GenerationOptions, LlmProvider, Message};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SageError};
use crate::market::{Interval, MarketDataProvider};

/// Placeholder for an undetected coin id or symbol
pub const UNKNOWN: &str = "UNKNOWN";

pub const DEFAULT_INTERVAL: Interval = Interval::OneMonth;
pub const DEFAULT_LANGUAGE: &str = "Arabic";

const DETECTOR_SYSTEM: &str = "You are a cryptocurrency coin identifier.";

const DETECTOR_PROMPT: &str = r#"You are a cryptocurrency coin identifier. Your task is to identify the specific cryptocurrency coin symbol, time interval, and the language of the user's query.
Understand the user query and figure out the symbol, interval, and language.

Examples of coin symbols mapping:
- Bitcoin, BTC, bitcoin, بيتكوين → BTC
- Ethereum, ETH, ethereum, ether, إيثيريوم → ETH
- Binance Coin, BNB, binance, بينانس كوين → BNB

Valid intervals:
{intervals}

Supported languages:
- "English" - for English queries
- "Arabic" - for Arabic queries (e.g., تحليل، عملة، سعر)
- "Spanish" - for Spanish queries
- "French" - for French queries
- "German" - for German queries
- Other languages as needed

User Query: "{query}"

Return ONLY a valid JSON object:

{"symbol": "identified_coin_symbol", "interval": "identified_interval", "language": "detected_language"}

Rules:
- Return only valid JSON, no additional text
- Use uppercase coin symbols as shown in the examples
- If no interval is mentioned, use "1 month"
- Interval must match exactly one of the valid intervals listed above
- Language must be the full name (e.g., "English", "Arabic", not "en", "ar")
- Detect language based on the script and vocabulary used in the query"#;

/// What the user asked about
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinQuery {
    pub coin_id: String,
    pub symbol: String,
    pub interval: Interval,
    pub language: String,
}

impl Default for CoinQuery {
    fn default() -> Self {
        Self {
            coin_id: UNKNOWN.into(),
            symbol: UNKNOWN.into(),
            interval: DEFAULT_INTERVAL,
            language: DEFAULT_LANGUAGE.into(),
        }
    }
}

impl CoinQuery {
    /// Whether both the symbol and the provider coin id were resolved
    pub fn is_resolved(&self) -> bool {
        self.coin_id != UNKNOWN && self.symbol != UNKNOWN
    }
}

#[derive(Debug, Deserialize)]
struct DetectedFields {
    symbol: String,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

/// First non-empty `{...}` span, ending at the first closing brace
pub fn extract_json_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let close = start + 1 + text[start + 1..].find('}')?;
        (close > start + 1).then(|| &text[start..=close])
    })
}

/// LLM-backed detector; never fails, falls back to [`CoinQuery::default`]
pub struct CoinDetector {
    llm: Arc<dyn LlmProvider>,
    market: Arc<dyn MarketDataProvider>,
    model: String,
}

impl CoinDetector {
    pub fn new(llm: Arc<dyn LlmProvider>, market: Arc<dyn MarketDataProvider>) -> Self {
        let model = llm.default_model().to_string();
        Self { llm, market, model }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub async fn detect(&self, query: &str) -> CoinQuery {
        match self.try_detect(query).await {
            Ok(found) => {
                info!(symbol = %found.symbol, coin_id = %found.coin_id, interval = %found.interval, "coin detected");
                found
            }
            Err(e) => {
                warn!(error = %e, "coin detection failed, using defaults");
                CoinQuery::default()
            }
        }
    }

    async fn try_detect(&self, query: &str) -> Result<CoinQuery> {
        let intervals = Interval::ALL
            .iter()
            .map(|i| format!("- \"{}\"", i))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = DETECTOR_PROMPT
            .replace("{intervals}", &intervals)
            .replace("{query}", query);

        let messages = [Message::system(DETECTOR_SYSTEM), Message::user(prompt)];
        let completion = self
            .llm
            .complete(&messages, &GenerationOptions::deterministic(&self.model))
            .await?;

        let json = extract_json_object(completion.content.trim())
            .ok_or_else(|| SageError::InvalidInput("detector reply has no JSON object".into()))?;
        let fields: DetectedFields = serde_json::from_str(json)?;

        let symbol = fields.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(SageError::InvalidInput("detector returned an empty symbol".into()));
        }

        let interval = match fields.interval.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_INTERVAL,
            Some(label) => label.parse().unwrap_or_else(|_| {
                warn!(label, "detector returned unknown interval");
                DEFAULT_INTERVAL
            }),
        };
        let language = fields
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.into());

        let coin_id = self
            .market
            .resolve_coin_id(&symbol)
            .await?
            .unwrap_or_else(|| UNKNOWN.into());

        Ok(CoinQuery {
            coin_id,
            symbol,
            interval,
            language,
        })
    }
}
