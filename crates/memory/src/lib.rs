//! Conversation memory backends for Sunnyside.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileConversationMemory;
pub use in_memory::InMemoryConversationMemory;

use std::sync::Arc;
use sunnyside_config::MemoryConfig;
use sunnyside_core::error::MemoryError;
use sunnyside_core::memory::ConversationMemory;

/// Build the conversation store selected by `[memory]`.
pub fn build_memory(config: &MemoryConfig) -> Result<Arc<dyn ConversationMemory>, MemoryError> {
    match config.backend.as_str() {
        "in_memory" => Ok(Arc::new(InMemoryConversationMemory::new())),
        "file" => Ok(Arc::new(FileConversationMemory::new(config.resolved_path()))),
        other => Err(MemoryError::Storage(format!(
            "Unknown memory backend '{other}'"
        ))),
    }
}
