//! Provider trait — the abstraction over the chat-completion service.
//!
//! A Provider takes a system prompt, a transcript, the advertised tool
//! schemas and an optional output schema, and answers with text, tool-call
//! requests, or a structured object.
//!
//! Implementations: OpenAI-compatible, Anthropic, and the retry wrapper.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::output::StructuredOutputFormat;
use crate::tool::{ToolCall, ToolSchema};

/// A single request to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-sonnet-4-5-20250929", "gpt-4o")
    pub model: String,

    /// System instructions, sent separately from the transcript
    pub system_prompt: String,

    /// The transcript, oldest first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    /// Native structured-output schema, when the provider supports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<StructuredOutputFormat>,

    /// Whether the model may skip the advertised tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

/// How the model is allowed to pick among the advertised tools.
///
/// Each provider maps this onto its own wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model may call a tool or answer in text.
    #[default]
    Auto,

    /// The model must call at least one tool.
    Any,
}

/// What the model produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// A natural-language answer
    Text(String),

    /// One or more tool calls, with any accompanying text
    ToolCalls {
        #[serde(default)]
        content: String,
        calls: Vec<ToolCall>,
    },

    /// A JSON object produced under a native `response_format`
    Structured(serde_json::Value),
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub completion: Completion,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend is in
/// use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Whether `ProviderRequest::response_format` is honoured natively.
    ///
    /// When false the agent advertises the output schema as a tool instead.
    fn supports_structured_output(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_serialization_is_tagged() {
        let completion = Completion::ToolCalls {
            content: String::new(),
            calls: vec![ToolCall {
                id: "call_1".into(),
                name: "get_user_location".into(),
                arguments: serde_json::json!({}),
            }],
        };
        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json["type"], "tool_calls");
        assert_eq!(json["calls"][0]["name"], "get_user_location");
    }

    #[test]
    fn request_omits_empty_optionals() {
        let req = ProviderRequest {
            model: "claude-sonnet-4-5-20250929".into(),
            system_prompt: "You are a forecaster".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.5,
            max_tokens: None,
            tools: vec![],
            response_format: None,
            tool_choice: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("response_format").is_none());
        assert!(json.get("tool_choice").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
