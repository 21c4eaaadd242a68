//! Crypto Analysis Tool
//!
//! Full pipeline for one coin: quote, market page, technicals, classical
//! scenarios and the SMC decision.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use agent_core::{
    tool::ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
};

use super::outcome;
use crate::advisor::{CryptoSage, ANALYSIS_TOOL};
use crate::intent::{DEFAULT_INTERVAL, DEFAULT_LANGUAGE};
use crate::market::Interval;

/// Tool wrapping [`CryptoSage::analyze`]
pub struct CryptoAnalysisTool {
    sage: Arc<CryptoSage>,
}

impl CryptoAnalysisTool {
    pub fn new(sage: Arc<CryptoSage>) -> Self {
        Self { sage }
    }
}

#[async_trait]
impl Tool for CryptoAnalysisTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: ANALYSIS_TOOL.into(),
            description: "Get comprehensive cryptocurrency analysis including price, market sentiment, technical indicators, classical trade scenarios and a smart-money decision".into(),
            parameters: vec![
                ParameterSchema::required("coin_id", "string", "The coin ID (e.g., 'bitcoin', 'ethereum')"),
                ParameterSchema::required("coin_symbol", "string", "The coin symbol (e.g., 'BTC', 'ETH')"),
                ParameterSchema::optional("interval", "string", "Time interval for the analysis")
                    .with_default(json!(DEFAULT_INTERVAL.as_str()))
                    .with_enum(Interval::ALL.map(Interval::as_str)),
                ParameterSchema::optional("language", "string", "Language of the final answer (e.g., 'Arabic', 'English')")
                    .with_default(json!(DEFAULT_LANGUAGE)),
            ],
            category: Some("market_data".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let coin_id = call.required_str("coin_id")?;
        let symbol = call.required_str("coin_symbol")?;
        let interval = match call.str_arg("interval").map(str::parse::<Interval>) {
            None => DEFAULT_INTERVAL,
            Some(Ok(interval)) => interval,
            Some(Err(e)) => return outcome(ANALYSIS_TOOL, e),
        };

        let report = match self.sage.analyze(coin_id, symbol, interval).await {
            Ok(report) => report,
            Err(e) => return outcome(ANALYSIS_TOOL, e),
        };

        let mut output = format!(
            "{} ({}) at ${:.4} ({:+.2}% 24h), interval {}\nClassical trend: {}",
            report.coin_id,
            report.symbol,
            report.current_price.price,
            report.current_price.change_24h,
            report.interval,
            report.classical.trend
        );
        match &report.smc {
            Some(decision) => output.push_str(&format!(
                "\nSMC: {} (confidence {:.2})",
                decision.action, decision.confidence
            )),
            None => output.push_str("\nSMC: unavailable"),
        }

        Ok(ToolResult::success(ANALYSIS_TOOL, output).with_data(json!(report)))
    }
}
