//! Shared test helpers for agent loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use sunnyside_core::error::ProviderError;
use sunnyside_core::provider::{Completion, Provider, ProviderRequest, ProviderResponse, Usage};
use sunnyside_core::tool::ToolCall;

/// A mock provider that returns a sequence of scripted responses and
/// records every request it receives.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    structured: bool,
    delay: Option<Duration>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            structured: true,
            delay: None,
        }
    }

    /// Report no native structured-output support.
    pub fn without_structured_output(mut self) -> Self {
        self.structured = false;
        self
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    fn supports_structured_output(&self) -> bool {
        self.structured
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("SequentialMockProvider: no more responses (call #{call})"))
    }
}

fn response(completion: Completion) -> ProviderResponse {
    ProviderResponse {
        completion,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a plain text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    response(Completion::Text(text.into()))
}

/// Create a native structured-output response.
pub fn make_structured_response(payload: serde_json::Value) -> ProviderResponse {
    response(Completion::Structured(payload))
}

/// Create a response requesting the given tool calls.
pub fn make_tool_call_response(calls: Vec<ToolCall>) -> ProviderResponse {
    response(Completion::ToolCalls {
        content: String::new(),
        calls,
    })
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args,
    }
}
