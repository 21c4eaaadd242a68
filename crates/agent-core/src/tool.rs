//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered at runtime and invoked by name, either from an LLM
//! function call or directly over HTTP.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{AgentError, Result};

/// Tool call request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Trimmed, non-empty string argument
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn required_str(&self, key: &str) -> Result<&str> {
        self.str_arg(key)
            .ok_or_else(|| AgentError::ToolValidation(format!("Missing required parameter: {}", key)))
    }

    /// Numeric argument; numeric strings are accepted too
    pub fn f64_arg(&self, key: &str) -> Option<f64> {
        match self.arguments.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Deserialize one argument; `Ok(None)` when absent or null
    pub fn arg<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| AgentError::ToolValidation(format!("Invalid '{}': {}", key, e))),
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    pub success: bool,

    /// Output (summary text or error)
    pub output: String,

    /// Structured data (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    pub description: String,

    #[serde(default)]
    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub has_side_effects: bool,
}

impl ToolSchema {
    /// Function-calling declaration in the OpenAI `tools` format
    pub fn to_function(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(param.param_type));
            prop.insert("description".into(), json!(param.description));
            if let Some(values) = &param.enum_values {
                prop.insert("enum".into(), Value::Array(values.clone()));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments before execution: required keys present and
    /// enum-constrained string values within their set
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            let value = call.arguments.get(&param.name).filter(|v| !v.is_null());

            if param.required && value.is_none() {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }

            if let (Some(value), Some(allowed)) = (value, &param.enum_values) {
                if !allowed.contains(value) {
                    return Err(AgentError::ToolValidation(format!(
                        "Unsupported value for {}: {}",
                        param.name, value
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Deadline applied to each execution
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        self.tools.insert(schema.name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Validate and execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tool.validate(call)?;

        debug!(tool = %call.name, args = call.arguments.len(), "executing tool");
        let result = tokio::time::timeout(self.timeout, tool.execute(call))
            .await
            .map_err(|_| AgentError::ToolTimeout {
                name: call.name.clone(),
                secs: self.timeout.as_secs(),
            })??;

        Ok(match &call.id {
            Some(id) => result.with_id(id.clone()),
            None => result,
        })
    }

    /// All tool schemas, ordered by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "Echo a message".into(),
                parameters: vec![
                    ParameterSchema::required("message", "string", "Text to echo"),
                    ParameterSchema::optional("mode", "string", "Casing")
                        .with_default(json!("plain"))
                        .with_enum(["plain", "upper"]),
                ],
                category: Some("test".into()),
                has_side_effects: false,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            let message = call.required_str("message")?;
            let output = match call.str_arg("mode") {
                Some("upper") => message.to_uppercase(),
                _ => message.to_string(),
            };
            Ok(ToolResult::success("echo", output))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "slow".into(),
                description: "Never finishes in time".into(),
                parameters: vec![],
                category: None,
                has_side_effects: false,
            }
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::success("slow", "done"))
        }
    }

    #[test]
    fn test_tool_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(SlowTool);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["echo", "slow"]);
        assert!(registry.get("unknown").is_none());
    }

    #[tokio::test]
    async fn test_execute_validates_and_tags_id() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let mut call = ToolCall::new("echo").with_arg("message", "hi").with_arg("mode", "upper");
        call.id = Some("call-1".into());
        let result = registry.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "HI");
        assert_eq!(result.id.as_deref(), Some("call-1"));

        let missing = ToolCall::new("echo");
        assert!(matches!(
            registry.execute(&missing).await,
            Err(AgentError::ToolValidation(_))
        ));

        let bad_enum = ToolCall::new("echo").with_arg("message", "hi").with_arg("mode", "loud");
        assert!(matches!(
            registry.execute(&bad_enum).await,
            Err(AgentError::ToolValidation(_))
        ));

        assert!(matches!(
            registry.execute(&ToolCall::new("nope")).await,
            Err(AgentError::ToolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(20));
        registry.register(SlowTool);

        let err = registry.execute(&ToolCall::new("slow")).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout { .. }));
    }

    #[test]
    fn test_call_argument_helpers() {
        let call = ToolCall::new("x")
            .with_arg("price", "101.5")
            .with_arg("qty", 3)
            .with_arg("blank", "  ")
            .with_arg("list", json!([1.0, 2.0]));

        assert_eq!(call.f64_arg("price"), Some(101.5));
        assert_eq!(call.f64_arg("qty"), Some(3.0));
        assert!(call.str_arg("blank").is_none());
        assert_eq!(call.arg::<Vec<f64>>("list").unwrap(), Some(vec![1.0, 2.0]));
        assert!(call.arg::<Vec<f64>>("missing").unwrap().is_none());
        assert!(call.arg::<Vec<f64>>("price").is_err());
    }

    #[test]
    fn test_function_schema() {
        let function = EchoTool.schema().to_function();
        assert_eq!(function["type"], "function");
        assert_eq!(function["function"]["name"], "echo");
        assert_eq!(function["function"]["parameters"]["required"], json!(["message"]));
        assert_eq!(
            function["function"]["parameters"]["properties"]["mode"]["enum"],
            json!(["plain", "upper"])
        );
    }
}
