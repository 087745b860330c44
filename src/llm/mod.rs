//! LLM client layer
//!
//! - Message and completion types
//! - `LlmClient` trait plus a scripted `MockLlmClient`
//! - `AnthropicClient` for the Messages API
//! - `extract_document` for pulling YAML out of model output

pub mod anthropic;
pub mod client;
pub mod extract;
pub mod types;

pub use anthropic::AnthropicClient;
pub use client::{LlmClient, MockLlmClient};
pub use extract::extract_document;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, ToolDefinition, Usage};
