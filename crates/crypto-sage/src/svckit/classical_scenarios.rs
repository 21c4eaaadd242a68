//! Classical Scenarios Tool
//!
//! Runs the classical engine on indicator values supplied as arguments.

use async_trait::async_trait;
use serde_json::json;

use agent_core::{
    tool::ParameterSchema, AgentError, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
};

use crate::model::{MarketSnapshot, TradeScenario};
use crate::strategy::ClassicalAnalyst;

pub const NAME: &str = "classical_scenarios";

/// Tool for deriving spot/futures long/short setups from a snapshot
#[derive(Clone, Debug, Default)]
pub struct ClassicalScenariosTool {
    analyst: ClassicalAnalyst,
}

impl ClassicalScenariosTool {
    pub fn new(analyst: ClassicalAnalyst) -> Self {
        Self { analyst }
    }
}

fn describe(scenario: &TradeScenario) -> String {
    let targets = match scenario.targets {
        Some([t1, t2, t3]) => format!("{:.4} / {:.4} / {:.4}", t1, t2, t3),
        None => "none".into(),
    };
    format!(
        "{:?} {:?}: entry {:.4}, stop {:.4}, targets {}",
        scenario.market, scenario.side, scenario.entry, scenario.stop_loss, targets
    )
    .to_lowercase()
}

#[async_trait]
impl Tool for ClassicalScenariosTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Derive spot and futures long/short trade scenarios (entry, stop loss, three targets) from price, moving averages, momentum and volatility.".into(),
            parameters: vec![
                ParameterSchema::required("current_price", "number", "Current price in USD"),
                ParameterSchema::optional("sma50", "number", "50-period simple moving average"),
                ParameterSchema::optional("sma200", "number", "200-period simple moving average"),
                ParameterSchema::optional("rsi", "number", "RSI(14), 0-100"),
                ParameterSchema::optional("macd", "number", "MACD line value"),
                ParameterSchema::optional(
                    "volatility",
                    "number",
                    "Volatility as a fraction of price (0.03 = 3%)",
                ),
            ],
            category: Some("analysis".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let price = call
            .f64_arg("current_price")
            .ok_or_else(|| AgentError::ToolValidation("current_price must be a number".into()))?;

        let snapshot = MarketSnapshot {
            current_price: Some(price),
            sma50: call.f64_arg("sma50"),
            sma200: call.f64_arg("sma200"),
            rsi: call.f64_arg("rsi"),
            macd: call.f64_arg("macd"),
            volatility: call.f64_arg("volatility"),
        };

        let analysis = self.analyst.derive_scenarios(&snapshot);
        let Some(scenarios) = &analysis.scenarios else {
            return Ok(ToolResult::failure(
                NAME,
                "current_price must be a positive, finite number",
            ));
        };

        let mut output = format!("Trend: {}\n", analysis.trend);
        for scenario in scenarios.iter() {
            output.push_str(&format!("  {}\n", describe(scenario)));
        }

        Ok(ToolResult::success(NAME, output.trim_end()).with_data(json!(analysis)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bullish_scenarios() {
        let call = ToolCall::new(NAME)
            .with_arg("current_price", 100.0)
            .with_arg("sma50", 95.0)
            .with_arg("sma200", 90.0)
            .with_arg("rsi", 55.0)
            .with_arg("volatility", 0.02);

        let result = ClassicalScenariosTool::default().execute(&call).await.unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("Trend: bullish"));
        assert!(result.output.contains("spot long: entry 100.0000, stop 97.0000"));

        let data = result.data.unwrap();
        assert_eq!(data["trend"], "bullish");
        let tp1 = data["scenarios"]["spot_long"]["targets"][0].as_f64().unwrap();
        assert!((tp1 - 103.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_price_is_validation_error() {
        let call = ToolCall::new(NAME).with_arg("current_price", "n/a");
        let err = ClassicalScenariosTool::default().execute(&call).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolValidation(_)));
    }

    #[tokio::test]
    async fn test_zero_price_is_failure() {
        let call = ToolCall::new(NAME).with_arg("current_price", 0.0);
        let result = ClassicalScenariosTool::default().execute(&call).await.unwrap();
        assert!(!result.success);
    }
}
