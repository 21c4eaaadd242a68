//! # agent-core
//!
//! Provider-agnostic LLM abstraction and the tool system the analysis
//! services are exposed through.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  caller (intent detection, narration, HTTP handlers)     │
//! │  ┌─────────────────────┐      ┌───────────────────────┐  │
//! │  │   ToolRegistry      │      │   LlmProvider         │  │
//! │  │   (schemas, exec)   │      │   (Strategy)          │  │
//! │  └─────────────────────┘      └───────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping the model backend without
//! changing any caller.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
