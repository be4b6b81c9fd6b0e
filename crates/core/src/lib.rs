//! # Sunnyside Core
//!
//! Domain types, traits, and error definitions for the Sunnyside
//! conversational agent. This crate has **no I/O of its own** — it defines
//! the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of a turn is a trait here: the completion service
//! ([`Provider`]), the tools ([`Tool`]) and the transcript store
//! ([`ConversationMemory`]). Implementations live in their own crates, so the
//! agent loop can be tested entirely against scripted stubs.

pub mod context;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod output;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::Context;
pub use error::{AgentError, MemoryError, ProviderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use memory::ConversationMemory;
pub use message::{Message, Role, ThreadId, Transcript};
pub use output::{ResponseFormat, StructuredOutput, StructuredOutputFormat};
pub use provider::{Completion, Provider, ProviderRequest, ProviderResponse, ToolChoice, Usage};
pub use tool::{Tool, ToolCall, ToolOutput, ToolRegistry, ToolSchema};
