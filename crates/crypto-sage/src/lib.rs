//! # crypto-sage
//!
//! Crypto market analyst: turns a free-text question about a coin into a
//! trade recommendation.
//!
//! ## Components
//!
//! - **Classical scenario engine** ([`strategy::classical`]): trend from the
//!   SMA50/SMA200 cross, volatility-scaled stops and 1R/2R/3R targets for
//!   spot and futures, long and short.
//! - **SMC analyzer** ([`strategy::smc`]): swings, fair value gaps,
//!   BOS/CHOCH structure and liquidity clusters scored into buy/sell/hold.
//! - **Pipeline** ([`advisor::CryptoSage`]): coin detection, concurrent
//!   market data gathering, both engines, LLM narration and Telegram
//!   formatting.
//!
//! ```text
//!   "ETH 4h setup?"
//!        │
//!        ▼
//!   CoinDetector ─► {ethereum, ETH, 4 hours, English}
//!        │
//!        ▼
//!   MarketDataProvider ─► snapshot ─► ClassicalAnalyst ─┐
//!                     └─► candles  ─► SmcAnalyzer ──────┼─► AnalysisReport
//!                                                       ▼
//!                                         LlmProvider narration ─► MarkdownV2
//! ```
//!
//! Both engines are pure functions of their numeric inputs; everything
//! that talks to the network sits behind the `MarketDataProvider` and
//! `LlmProvider` traits.

pub mod advisor;
pub mod error;
pub mod intent;
pub mod market;
pub mod model;
pub mod numeric;
pub mod strategy;
pub mod svckit;
pub mod telegram;

use std::sync::Arc;

use agent_core::ToolRegistry;

pub use advisor::{AnalysisReport, CryptoSage};
pub use error::{Result, SageError};
pub use intent::{CoinDetector, CoinQuery};
pub use market::{Interval, LiveMarketData, MarketDataProvider, MockMarketData};
pub use model::{Candle, ClassicalAnalysis, MarketSnapshot, OhlcSeries, TradeScenario, Trend};
pub use strategy::{Action, ClassicalAnalyst, ClassicalConfig, Decision, SmcAnalyzer, SmcConfig};
pub use telegram::format_for_telegram;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{ClassicalScenariosTool, CryptoAnalysisTool, SmcAnalysisTool};
}

/// Register every analysis tool, sharing the pipeline's engine settings
pub fn register_tools(registry: &mut ToolRegistry, sage: Arc<CryptoSage>) {
    registry.register(tools::ClassicalScenariosTool::new(sage.classical_analyst().clone()));
    registry.register(tools::SmcAnalysisTool::new(sage.smc_analyzer().config().clone()));
    registry.register(tools::CryptoAnalysisTool::new(sage));
}
