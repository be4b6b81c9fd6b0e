//! Error types for the Sunnyside domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`AgentError`] is what a
//! caller of a single conversational turn sees.

use std::time::Duration;
use thiserror::Error;

/// Everything that can end a turn early.
///
/// None of these are recovered inside the agent loop. A turn that fails
/// with any of them leaves the conversation transcript untouched.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The completion service asked for a tool that is not registered.
    #[error("Unknown tool requested by the model: {0}")]
    UnknownTool(String),

    /// A registered tool failed while executing.
    #[error("Tool '{tool_name}' failed: {source}")]
    ToolExecution {
        tool_name: String,
        #[source]
        source: ToolError,
    },

    /// The final payload did not conform to the declared output schema.
    #[error("Invalid structured output: {0}")]
    InvalidStructuredOutput(String),

    /// The completion service could not be reached or returned an error.
    #[error("Completion service unavailable: {0}")]
    ServiceUnavailable(#[from] ProviderError),

    /// The model kept requesting tools past the per-turn round limit.
    #[error("Exceeded the maximum of {0} tool-call rounds in a single turn")]
    MaxIterationsExceeded(u32),

    /// The caller-supplied turn timeout elapsed.
    #[error("Turn timed out after {0:?}")]
    TurnTimedOut(Duration),

    /// The conversation store failed.
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether a caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::NotConfigured(_) | Self::InvalidResponse(_) => {
                false
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted transcript for thread {thread_id}: {reason}")]
    Corrupted { thread_id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
