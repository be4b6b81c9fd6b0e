//! Message and Transcript domain types.
//!
//! These are the value objects that flow through a turn:
//! user message → completion service → (tool calls → tool results)* → final answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolCall;

/// Identifier of a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// A fresh random thread identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

/// A single message in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// Text typed by the end user.
    User {
        id: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// Output of the model.
    ///
    /// Mid-turn assistant messages carry `tool_calls`; the final message of
    /// a turn carries the validated `structured` payload.
    Assistant {
        id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        structured: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
    },

    /// The output of a tool invocation, fed back to the model.
    ToolResult {
        id: String,
        call_id: String,
        tool_name: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a plain assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
            structured: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message requesting tool calls.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            tool_calls,
            structured: None,
            timestamp: Utc::now(),
        }
    }

    /// Create the final assistant message of a turn from a validated payload.
    ///
    /// The text content is the compact JSON encoding so that providers
    /// without a notion of structured messages still see the answer.
    pub fn structured(payload: serde_json::Value) -> Self {
        Self::Assistant {
            id: Uuid::new_v4().to_string(),
            content: payload.to_string(),
            tool_calls: Vec::new(),
            structured: Some(payload),
            timestamp: Utc::now(),
        }
    }

    /// Create a tool result message.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResult {
            id: Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User { id, .. } | Self::Assistant { id, .. } | Self::ToolResult { id, .. } => id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::ToolResult { .. } => Role::ToolResult,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::User { content, .. }
            | Self::Assistant { content, .. }
            | Self::ToolResult { content, .. } => content,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::User { timestamp, .. }
            | Self::Assistant { timestamp, .. }
            | Self::ToolResult { timestamp, .. } => *timestamp,
        }
    }

    /// Tool calls carried by an assistant message (empty for other roles).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// The structured payload of a final assistant message, if any.
    pub fn structured_payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Assistant { structured, .. } => structured.as_ref(),
            _ => None,
        }
    }
}

/// An ordered, append-only message history for one thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub thread_id: ThreadId,

    /// Ordered messages
    pub messages: Vec<Message>,

    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    /// Create an empty transcript for the given thread.
    pub fn new(thread_id: ThreadId) -> Self {
        let now = Utc::now();
        Self {
            thread_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}
