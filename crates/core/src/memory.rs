//! ConversationMemory trait — per-thread, append-only transcripts.
//!
//! The agent loop reads a thread's transcript at the start of a turn and
//! appends the user message and the final answer once the turn succeeds.

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::message::{Message, ThreadId, Transcript};

/// The core ConversationMemory trait.
///
/// Implementations: in-memory (process lifetime), JSON-lines files.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// The backend name (e.g., "in_memory", "file").
    fn name(&self) -> &str;

    /// The transcript for a thread; an empty transcript if the thread is unseen.
    async fn get(&self, thread_id: &ThreadId) -> Result<Transcript, MemoryError>;

    /// Append a message. Visible to the next `get` for the same thread.
    async fn append(&self, thread_id: &ThreadId, message: Message) -> Result<(), MemoryError>;

    /// Append several messages in order.
    ///
    /// Backends that can commit a batch at once should override this so a
    /// turn's messages land together.
    async fn extend(&self, thread_id: &ThreadId, messages: Vec<Message>) -> Result<(), MemoryError> {
        for message in messages {
            self.append(thread_id, message).await?;
        }
        Ok(())
    }

    /// All thread identifiers that have at least one message.
    async fn threads(&self) -> Result<Vec<ThreadId>, MemoryError>;
}
