//! SMC Analysis Tool

use async_trait::async_trait;
use serde_json::json;

use agent_core::{
    tool::ParameterSchema, AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
};

use super::outcome;
use crate::model::{Candle, OhlcSeries};
use crate::strategy::{SmcAnalyzer, SmcConfig};

pub const NAME: &str = "smc_analysis";

/// Scores a buy/sell/hold decision from caller-supplied candles
#[derive(Clone, Debug, Default)]
pub struct SmcAnalysisTool {
    config: SmcConfig,
}

impl SmcAnalysisTool {
    /// `config` supplies the defaults for arguments the caller leaves out
    pub fn new(config: SmcConfig) -> Self {
        Self { config }
    }

    fn config_for(&self, call: &ToolCall) -> CoreResult<SmcConfig> {
        let swing_length = match call.f64_arg("swing_length") {
            Some(n) if n.fract() == 0.0 && n >= 1.0 => n as usize,
            Some(n) => {
                return Err(AgentError::ToolValidation(format!(
                    "swing_length must be a positive integer, got {}",
                    n
                )))
            }
            None => self.config.swing_length,
        };

        Ok(SmcConfig {
            swing_length,
            fvg_max_dist_pct: call.f64_arg("fvg_max_dist_pct").unwrap_or(self.config.fvg_max_dist_pct),
            liq_range_pct: call.f64_arg("liq_range_pct").unwrap_or(self.config.liq_range_pct),
        })
    }
}

#[async_trait]
impl Tool for SmcAnalysisTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Smart Money Concepts analysis of OHLC candles: swings, fair value gaps, BOS/CHOCH and liquidity clusters scored into a buy/sell/hold decision with entry, stop and targets.".into(),
            parameters: vec![
                ParameterSchema::required(
                    "candles",
                    "array",
                    "Candles oldest first, each {open, high, low, close, timestamp?}",
                ),
                ParameterSchema::optional("swing_length", "integer", "Bars on each side a swing must dominate")
                    .with_default(json!(self.config.swing_length)),
                ParameterSchema::optional("fvg_max_dist_pct", "number", "Max relative distance for a near fair value gap")
                    .with_default(json!(self.config.fvg_max_dist_pct)),
                ParameterSchema::optional("liq_range_pct", "number", "Liquidity clustering tolerance")
                    .with_default(json!(self.config.liq_range_pct)),
            ],
            category: Some("analysis".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let candles: Vec<Candle> = call.arg("candles")?.unwrap_or_default();
        let series = OhlcSeries::new(candles);
        if let Err(e) = series.validate() {
            return outcome(NAME, e);
        }

        let analyzer = match SmcAnalyzer::new(self.config_for(call)?) {
            Ok(analyzer) => analyzer,
            Err(e) => return Err(AgentError::ToolValidation(e.to_string())),
        };

        let decision = match analyzer.analyze_trade(&series) {
            Ok(decision) => decision,
            Err(e) => return outcome(NAME, e),
        };

        let mut output = format!(
            "Action: {} (confidence {:.2})\nReason: {}",
            decision.action, decision.confidence, decision.reason
        );
        if let (Some(entry), Some(stop)) = (decision.entry, decision.stop) {
            output.push_str(&format!("\nEntry: {}  Stop: {}", entry, stop));
        }
        if !decision.targets.is_empty() {
            let targets: Vec<String> = decision.targets.iter().map(|t| format!("{:.4}", t)).collect();
            output.push_str(&format!("\nTargets: {}", targets.join(" / ")));
        }

        Ok(ToolResult::success(NAME, output).with_data(json!(decision)))
    }
}
