//! Service Kit - Agent Tools
//!
//! Analysis capabilities exposed as `agent_core::Tool`s so they can be
//! listed with function-calling schemas and invoked by name.

mod classical_scenarios;
mod crypto_analysis;
mod smc_analysis;

pub use classical_scenarios::ClassicalScenariosTool;
pub use crypto_analysis::CryptoAnalysisTool;
pub use smc_analysis::SmcAnalysisTool;

use agent_core::{AgentError, Result as CoreResult, ToolResult};

use crate::error::SageError;

/// Bad input is a validation error for the caller; collaborator failures
/// become a failed result the narrator can still talk about.
fn outcome(tool: &str, err: SageError) -> CoreResult<ToolResult> {
    if err.is_client_error() {
        Err(AgentError::ToolValidation(err.to_string()))
    } else {
        Ok(ToolResult::failure(tool, err.user_message()))
    }
}
