//! Analysis Pipeline and Narration
//!
//! ```text
//!   query ──► CoinDetector ──► analyze() ──► LLM narration ──► Telegram text
//!                               │
//!              ┌────────────────┼──────────────────┬──────────────┐
//!           spot price     market page        technicals        OHLC
//!                               └──── snapshot ────┘              │
//!                                ClassicalAnalyst            SmcAnalyzer
//! ```

use std::sync::Arc;

use agent_core::{GenerationOptions, LlmProvider, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{Result, SageError};
use crate::intent::{CoinDetector, CoinQuery, UNKNOWN};
use crate::market::{IndicatorSheet, Interval, MarketData, MarketDataProvider, SpotPrice};
use crate::model::{ClassicalAnalysis, MarketSnapshot};
use crate::numeric::first_present;
use crate::strategy::{ClassicalAnalyst, ClassicalConfig, Decision, SmcAnalyzer, SmcConfig};
use crate::telegram::format_for_telegram;

/// Name the report is attributed to in the narration context
pub const ANALYSIS_TOOL: &str = "get_crypto_analysis";

const NARRATION_TEMPERATURE: f32 = 0.1;

/// System prompt for the narrating analyst
pub const SAGE_PROMPT: &str = r#"You are CryptoSage, a professional cryptocurrency trading analyst who turns market data into actionable trade setups.

LANGUAGE:
- Reply in the language named under "Output Language", or the language of the user's latest message when none is given.
- Never switch to English unless the user does.

USING THE ANALYSIS:
- A `get_crypto_analysis` result follows the user message whenever a coin was identified. Read every section:
  * current_price and market_data (sentiment and volatility; fear & greed, green days and predictions only when present)
  * technical_analysis (interpreted indicators for the requested interval)
  * classical (trend plus spot_long, spot_short, futures_long, futures_short scenarios)
  * smc (smart-money decision: action, confidence, entry, stop, targets, reason)
- Never invent a market_data field that is missing from the result.
- Summarize, do not list raw values. Combine classical, SMC and market data into one confluence-based view.
- Mention all four classical scenarios in one short line each: bias, first target, stop.
- If the result contains an "error", say briefly that live data is unavailable and give general guidance only.

DETAILED ANALYSIS FORMAT:
**DETAILED ANALYSIS FOR [SYMBOL]:**

**LONG (Buy Scenario):**
Entry: [spot] (Spot) / [futures] (Futures)
Stop Loss: [spot] (Spot) / [futures] (Futures)
Targets: 1. [..] 2. [..] 3. [..]

**SHORT (Sell Scenario):**
Entry: [spot] (Spot) / [futures] (Futures)
Stop Loss: [spot] (Spot) / [futures] (Futures)
Targets: 1. [..] 2. [..] 3. [..]

**Market Insights:**
- Trend, sentiment and fear/greed, volatility, support/resistance
- Technical bias (SMC and classical alignment) and confidence
- Futures leverage suited to the volatility

**Final Recommendation:**
- Best Approach: LONG / SHORT
- Justification: one or two sentences

For "suggested spot/futures trade" requests use a compact form with both a long and a short entry, stop and targets, plus the suggested trade.

RISK:
- Conservative 1x-2x, moderate 2x-3x, aggressive 3x-5x only when every strategy agrees.
- Always include a stop loss and at least two targets.

IDENTITY:
- "Who are you": "I am CryptoSage, your cryptocurrency trading analyst providing concise, reliable trade setups and market insights."

Keep answers under 200 words, direct and professional."#;

/// Everything gathered and derived for one coin and interval
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub coin_id: String,
    pub symbol: String,
    pub interval: Interval,
    pub current_price: SpotPrice,
    pub market_data: MarketData,
    pub technical_analysis: IndicatorSheet,
    /// Classical engine input after normalization
    pub snapshot: MarketSnapshot,
    pub classical: ClassicalAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smc: Option<Decision>,
    /// Why `smc` is missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smc_unavailable: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Apology returned when narration fails, localized where possible
pub fn apology(language: &str, coin_id: Option<&str>) -> String {
    let coin = coin_id
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != UNKNOWN)
        .map(str::to_uppercase);

    match language.trim().to_lowercase().as_str() {
        "english" => format!(
            "I apologize, but I'm experiencing technical difficulties. As CryptoSage, I specialize in cryptocurrency analysis for {}. Please try again.",
            coin.as_deref().unwrap_or("cryptocurrencies")
        ),
        "arabic" => format!(
            "أعتذر، ولكنني أواجه صعوبات تقنية. كـ CryptoSage، أتخصص في تحليل العملات المشفرة لـ {}. يرجى المحاولة مرة أخرى.",
            coin.as_deref().unwrap_or("العملات المشفرة")
        ),
        _ => "I apologize, please try again.".into(),
    }
}

/// Analysis pipeline: detection, data gathering, both engines and narration
pub struct CryptoSage {
    llm: Arc<dyn LlmProvider>,
    market: Arc<dyn MarketDataProvider>,
    detector: CoinDetector,
    classical: ClassicalAnalyst,
    smc: SmcAnalyzer,
    model: String,
}

impl CryptoSage {
    pub fn new(llm: Arc<dyn LlmProvider>, market: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            detector: CoinDetector::new(llm.clone(), market.clone()),
            model: llm.default_model().to_string(),
            llm,
            market,
            classical: ClassicalAnalyst::default(),
            smc: SmcAnalyzer::default(),
        }
    }

    pub fn with_classical(mut self, config: ClassicalConfig) -> Self {
        self.classical = ClassicalAnalyst::new(config);
        self
    }

    pub fn with_smc(mut self, config: SmcConfig) -> Result<Self> {
        self.smc = SmcAnalyzer::new(config)?;
        Ok(self)
    }

    /// Model for both detection and narration
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.detector = CoinDetector::new(self.llm.clone(), self.market.clone()).with_model(&model);
        self.model = model;
        self
    }

    pub fn market(&self) -> &Arc<dyn MarketDataProvider> {
        &self.market
    }

    pub fn smc_analyzer(&self) -> &SmcAnalyzer {
        &self.smc
    }

    pub fn classical_analyst(&self) -> &ClassicalAnalyst {
        &self.classical
    }

    /// Gather market data for a coin and run both engines.
    ///
    /// Quote, market page and technicals are required; OHLC history is
    /// optional and only its absence disables the SMC decision.
    pub async fn analyze(&self, coin_id: &str, symbol: &str, interval: Interval) -> Result<AnalysisReport> {
        let coin_id = coin_id.trim();
        let symbol = symbol.trim().to_uppercase();
        if coin_id.is_empty() || coin_id == UNKNOWN {
            return Err(SageError::InvalidInput("coin_id is required".into()));
        }
        if symbol.is_empty() || symbol == UNKNOWN {
            return Err(SageError::InvalidInput("coin_symbol is required".into()));
        }

        let (spot, market_data, technicals, ohlc) = tokio::join!(
            self.market.spot_price(coin_id),
            self.market.market_data(coin_id),
            self.market.technicals(&symbol, interval),
            self.market.ohlc(coin_id, interval.ohlc_days()),
        );
        let (spot, market_data, technicals) = (spot?, market_data?, technicals?);

        let mut snapshot = MarketSnapshot::normalize(&market_data, &technicals);
        snapshot.current_price = first_present([snapshot.current_price, Some(spot.price)]);
        let classical = self.classical.derive_scenarios(&snapshot);

        let (smc, smc_unavailable) = match ohlc.and_then(|series| self.smc.analyze_trade(&series)) {
            Ok(decision) => (Some(decision), None),
            Err(e) => {
                warn!(coin_id, error = %e, "smc analysis skipped");
                (None, Some(e.to_string()))
            }
        };

        info!(
            coin_id,
            symbol = %symbol,
            interval = %interval,
            trend = ?classical.trend,
            smc_action = ?smc.as_ref().map(|d| d.action),
            provider = self.market.name(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            coin_id: coin_id.to_string(),
            symbol,
            interval,
            current_price: spot,
            market_data,
            technical_analysis: technicals,
            snapshot,
            classical,
            smc,
            smc_unavailable,
            generated_at: Utc::now(),
        })
    }

    /// Narrated reply for a detected query, unformatted
    pub async fn narrate(&self, text: &str, query: &CoinQuery) -> Result<String> {
        let mut messages = vec![Message::system(SAGE_PROMPT)];

        if query.is_resolved() {
            messages.push(Message::user(format!(
                "User Query: {}\n\nContext: Analyze {} ({}) with interval: {}\n\nOutput Language: {}",
                text, query.coin_id, query.symbol, query.interval, query.language
            )));

            let context = match self.analyze(&query.coin_id, &query.symbol, query.interval).await {
                Ok(report) => serde_json::to_string(&report)?,
                Err(e) => {
                    warn!(coin_id = %query.coin_id, error = %e, "analysis failed, narrating without data");
                    json!({ "error": e.user_message() }).to_string()
                }
            };
            messages.push(Message::tool(ANALYSIS_TOOL, context));
        } else {
            messages.push(Message::user(text));
        }

        let options = GenerationOptions::default()
            .with_model(&self.model)
            .with_temperature(NARRATION_TEMPERATURE);
        let completion = self.llm.complete(&messages, &options).await?;

        let reply = completion.content.trim();
        if reply.is_empty() {
            return Ok("No response generated".into());
        }
        Ok(reply.to_string())
    }

    /// Detect, analyze, narrate and format a free-text request.
    ///
    /// Never fails: narration errors become a localized apology.
    pub async fn process_query(&self, text: &str) -> String {
        let query = self.detector.detect(text).await;

        let reply = match self.narrate(text, &query).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, language = %query.language, "narration failed");
                apology(&query.language, Some(&query.coin_id))
            }
        };

        format_for_telegram(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::tests::ScriptedLlm;
    use crate::market::MockMarketData;
    use crate::model::Trend;
    use crate::strategy::Action;
    use agent_core::Role;

    fn sage(replies: &[&str]) -> (CryptoSage, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::new(replies));
        let sage = CryptoSage::new(llm.clone(), Arc::new(MockMarketData::new()));
        (sage, llm)
    }

    #[test]
    fn test_apology_localization() {
        assert!(apology("English", Some("bitcoin")).contains("for BITCOIN."));
        assert!(apology("english", Some(UNKNOWN)).contains("for cryptocurrencies."));
        assert!(apology("Arabic", None).contains("العملات المشفرة"));
        assert!(apology("Arabic", Some("ethereum")).contains("ETHEREUM"));
        assert_eq!(apology("Spanish", Some("bitcoin")), "I apologize, please try again.");
    }

    #[tokio::test]
    async fn test_analyze_with_mock_market() {
        let (sage, _) = sage(&[]);
        let report = sage.analyze("bitcoin", "btc", Interval::OneDay).await.unwrap();

        assert_eq!(report.symbol, "BTC");
        assert_eq!(report.snapshot.current_price, Some(97_500.0));
        assert_eq!(report.classical.trend, Trend::Bullish);
        assert!(report.classical.scenarios.is_some());
        assert!(!report.technical_analysis.is_empty());

        let decision = report.smc.expect("mock history yields a decision");
        assert!(matches!(decision.action, Action::Buy | Action::Sell | Action::Hold));
        assert!((0.0..=1.0).contains(&decision.confidence));
        assert!(report.smc_unavailable.is_none());
    }

    #[tokio::test]
    async fn test_analyze_rejects_unknown_and_unsupported() {
        let (sage, _) = sage(&[]);
        assert!(matches!(
            sage.analyze(UNKNOWN, "BTC", Interval::OneDay).await,
            Err(SageError::InvalidInput(_))
        ));
        assert!(matches!(
            sage.analyze("notacoin", "NOPE", Interval::OneDay).await,
            Err(SageError::UnsupportedAsset(_))
        ));
    }

    #[tokio::test]
    async fn test_process_query_narrates_with_report() {
        let (sage, llm) = sage(&[
            r#"{"symbol": "ETH", "interval": "4 hours", "language": "English"}"#,
            "## ETH Outlook\n**Bias:** long above 3,400.5!",
        ]);

        let reply = sage.process_query("ETH 4h setup?").await;
        assert_eq!(reply, "*ETH OUTLOOK*\n*Bias:* long above 3,400\\.5\\!");

        let seen = llm.seen.lock().unwrap();
        let narration = &seen[1];
        assert_eq!(narration[0].content, SAGE_PROMPT);
        assert!(narration[1].content.contains("Analyze ethereum (ETH) with interval: 4 hours"));
        assert_eq!(narration[2].role, Role::Tool);

        let report: serde_json::Value = serde_json::from_str(&narration[2].content).unwrap();
        assert_eq!(report["coin_id"], "ethereum");
        assert_eq!(report["interval"], "4 hours");
        assert!(report["classical"]["scenarios"]["futures_long"].is_object());
    }

    #[tokio::test]
    async fn test_unresolved_query_is_plain_chat() {
        let (sage, llm) = sage(&["not json", "I am CryptoSage."]);

        let reply = sage.process_query("who are you").await;
        assert_eq!(reply, "I am CryptoSage\\.");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[1].len(), 2);
        assert_eq!(seen[1][1].content, "who are you");
    }

    #[tokio::test]
    async fn test_analysis_error_is_passed_as_context() {
        let (sage, llm) = sage(&["Data unavailable."]);
        let query = CoinQuery {
            coin_id: "notacoin".into(),
            symbol: "NOPE".into(),
            ..Default::default()
        };
        let reply = sage.narrate("analyze", &query).await.unwrap();
        assert_eq!(reply, "Data unavailable.");

        let seen = llm.seen.lock().unwrap();
        let context: serde_json::Value = serde_json::from_str(&seen[0][2].content).unwrap();
        assert_eq!(context["error"], "The coin 'notacoin' is not supported.");
    }

    #[tokio::test]
    async fn test_provider_failure_yields_apology() {
        let (sage, _) = sage(&[r#"{"symbol": "BTC", "language": "English"}"#]);

        let reply = sage.process_query("btc?").await;
        assert!(reply.starts_with("I apologize, but I'm experiencing technical difficulties\\."));
        assert!(reply.contains("BITCOIN"));
    }
}
