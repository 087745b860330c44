//! Anthropic Messages API client

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::{Result, SpecloopError};
use crate::llm::client::LlmClient;
use crate::llm::types::{CompletionRequest, CompletionResponse, Role, StopReason, ToolCall, Usage};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    usage: Arc<Mutex<Usage>>,
}

impl AnthropicClient {
    /// Build a client from config, reading the key from `config.api_key_env` once
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| SpecloopError::Config(format!("{} not set", config.api_key_env)))?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SpecloopError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: ANTHROPIC_API_URL.to_string(),
            usage: Arc::new(Mutex::new(Usage::default())),
        })
    }

    /// Point the client at another endpoint (proxies, local stubs)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let max_tokens = request.max_tokens.unwrap_or(self.max_tokens);

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": messages
        });

        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_anthropic_schema()).collect();
            body["tools"] = json!(tools);
        }

        body
    }

    fn parse_response(&self, body: Value) -> CompletionResponse {
        let stop_reason = StopReason::from_api(body["stop_reason"].as_str());

        let usage = body
            .get("usage")
            .map(|u| {
                Usage::new(
                    u["input_tokens"].as_u64().unwrap_or(0),
                    u["output_tokens"].as_u64().unwrap_or(0),
                )
            })
            .unwrap_or_default();

        self.usage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(&usage);

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in body["content"].as_array().into_iter().flatten() {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        if !content.is_empty() {
                            content.push('\n');
                        }
                        content.push_str(text);
                    }
                }
                Some("tool_use") => {
                    let id = block["id"].as_str().unwrap_or_default();
                    let name = block["name"].as_str().unwrap_or_default();
                    tool_calls.push(ToolCall::new(id, name, block["input"].clone()));
                }
                _ => {}
            }
        }

        CompletionResponse {
            content,
            tool_calls,
            stop_reason,
            usage,
        }
    }

    async fn send_request(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(SpecloopError::Unavailable(format!(
                "Rate limited, retry after {} seconds",
                retry_after
            )));
        }

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("API error {}: {}", status, error_body);
            return Err(if status.is_server_error() {
                SpecloopError::Unavailable(message)
            } else {
                SpecloopError::Llm(message)
            });
        }

        response
            .json()
            .await
            .map_err(|e| SpecloopError::Llm(format!("Failed to parse response: {}", e)))
    }

    /// Cumulative token usage across every call on this client
    pub fn total_usage(&self) -> Usage {
        *self.usage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(&request);
        log::debug!(
            "Sending {} message(s) to {}",
            request.messages.len(),
            body["model"].as_str().unwrap_or_default()
        );
        let response = self.send_request(body).await?;
        Ok(self.parse_response(response))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolDefinition;

    fn client() -> AnthropicClient {
        AnthropicClient::with_api_key("test-key", &LlmConfig::default()).unwrap()
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = LlmConfig {
            api_key_env: "SPECLOOP_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let err = AnthropicClient::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("SPECLOOP_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_build_request_basic() {
        let request = CompletionRequest::new("You are helpful").with_user_message("Hello");
        let body = client().build_request(&request);

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["system"], "You are helpful");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_with_tools_and_overrides() {
        let tool = ToolDefinition::new("submit_requirements", "Submit", json!({"type": "object"}));
        let mut request = CompletionRequest::new("")
            .with_user_message("hi")
            .with_tools(vec![tool])
            .with_max_tokens(100);
        request.model = Some("claude-opus-4-20250514".to_string());

        let body = client().build_request(&request);
        assert_eq!(body["model"], "claude-opus-4-20250514");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["tools"][0]["name"], "submit_requirements");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_response_text_and_tool_use() {
        let client = client();
        let response = client.parse_response(json!({
            "content": [
                { "type": "text", "text": "Done." },
                { "type": "text", "text": "Submitting." },
                {
                    "type": "tool_use",
                    "id": "toolu_1",
                    "name": "submit_requirements",
                    "input": { "markdown": "# API" }
                }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 50, "output_tokens": 30 }
        }));

        assert_eq!(response.content, "Done.\nSubmitting.");
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls[0].input["markdown"], "# API");
        assert_eq!(response.usage, Usage::new(50, 30));
    }

    #[test]
    fn test_parse_response_without_content() {
        let response = client().parse_response(json!({ "stop_reason": "end_turn" }));
        assert!(response.content.is_empty());
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.usage.total(), 0);
    }

    #[test]
    fn test_total_usage_accumulation() {
        let client = client();
        client.parse_response(json!({"content": [], "usage": { "input_tokens": 100, "output_tokens": 50 }}));
        client.parse_response(json!({"content": [], "usage": { "input_tokens": 200, "output_tokens": 100 }}));
        assert_eq!(client.total_usage(), Usage::new(300, 150));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let client = client().with_base_url("http://127.0.0.1:9/v1/messages");
        let err = client
            .complete(CompletionRequest::new("s").with_user_message("hi"))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_debug_hides_key() {
        let debug_str = format!("{:?}", client());
        assert!(debug_str.contains("AnthropicClient"));
        assert!(!debug_str.contains("test-key"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnthropicClient>();
    }
}
