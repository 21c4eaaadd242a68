//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo,
        TokenUsage,
    },
};
use async_trait::async_trait;
use ollama_rs::{
    generation::{
        chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
    },
    models::ModelOptions as OllamaOptions,
    Ollama,
};
use tracing::{debug, warn};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    pub port: u16,

    /// Model used when the caller passes an empty model name
    pub model: String,

    /// Per-request deadline in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            model: "llama3.2".into(),
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let model = std::env::var("OLLAMA_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.model);
        let timeout_secs = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            host,
            port,
            model,
            timeout_secs,
        }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Convert agent messages to Ollama format
    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatMessage::new(MessageRole::System, m.content.clone()),
                Role::User => ChatMessage::new(MessageRole::User, m.content.clone()),
                Role::Assistant => ChatMessage::new(MessageRole::Assistant, m.content.clone()),
                // Tool output appears as labelled user context
                Role::Tool => {
                    let label = m.name.as_deref().unwrap_or("tool");
                    ChatMessage::new(
                        MessageRole::User,
                        format!("[{} result]\n{}", label, m.content),
                    )
                }
            })
            .collect()
    }

    fn convert_completion(response: ChatMessageResponse, model: &str, max_tokens: u32) -> Completion {
        let usage = response.final_data.as_ref().map(|d| {
            let prompt = d.prompt_eval_count as u32;
            let completion = d.eval_count as u32;
            TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }
        });
        let truncated = usage
            .as_ref()
            .is_some_and(|u| u.completion_tokens >= max_tokens);

        Completion {
            content: response.message.content,
            model: model.to_string(),
            usage,
            truncated,
            finish_reason: Some(if truncated {
                FinishReason::Length
            } else {
                FinishReason::Stop
            }),
        }
    }

    fn build_options(opts: &GenerationOptions) -> OllamaOptions {
        OllamaOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(opts.max_tokens as i32)
    }

    fn model_for<'a>(&'a self, opts: &'a GenerationOptions) -> &'a str {
        if opts.model.trim().is_empty() {
            &self.config.model
        } else {
            &opts.model
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "Ollama".into(),
            version: None,
            models,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let model = self.model_for(options).to_string();
        let mut ollama_messages = Self::convert_messages(messages);
        if let Some(system) = &options.system_prompt {
            ollama_messages.insert(0, ChatMessage::new(MessageRole::System, system.clone()));
        }

        let request = ChatMessageRequest::new(model.clone(), ollama_messages)
            .options(Self::build_options(options));

        debug!(model = %model, messages = messages.len(), "ollama chat request");
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let response = tokio::time::timeout(timeout, self.client.send_chat_messages(request))
            .await
            .map_err(|_| {
                AgentError::ProviderUnavailable(format!(
                    "Ollama did not answer within {}s",
                    self.config.timeout_secs
                ))
            })?
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(Self::convert_completion(response, &model, options.max_tokens))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                context_length: None,
            })
            .collect())
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.model, "llama3.2");
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are CryptoSage."),
            Message::user("Analyze BTC"),
            Message::tool("get_crypto_analysis", "{\"price\": 1}"),
        ];

        let converted = OllamaProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 3);
        assert!(converted[2].content.starts_with("[get_crypto_analysis result]"));
    }

    #[test]
    fn test_empty_model_uses_configured_default() {
        let provider = OllamaProvider::from_config(OllamaConfig {
            model: "qwen2.5".into(),
            ..Default::default()
        });
        let opts = GenerationOptions::default().with_model("");
        assert_eq!(provider.model_for(&opts), "qwen2.5");
        assert_eq!(provider.default_model(), "qwen2.5");

        let opts = GenerationOptions::default();
        assert_eq!(provider.model_for(&opts), "llama3.2");
    }
}
