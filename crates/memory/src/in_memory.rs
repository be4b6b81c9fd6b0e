//! In-memory backend — transcripts live for the lifetime of the process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use sunnyside_core::error::MemoryError;
use sunnyside_core::memory::ConversationMemory;
use sunnyside_core::message::{Message, ThreadId, Transcript};
use tokio::sync::RwLock;

/// A conversation store that keeps every thread in a map.
/// Threads are created lazily and never evicted.
pub struct InMemoryConversationMemory {
    threads: Arc<RwLock<HashMap<ThreadId, Transcript>>>,
}

impl InMemoryConversationMemory {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationMemory for InMemoryConversationMemory {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, thread_id: &ThreadId) -> Result<Transcript, MemoryError> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .cloned()
            .unwrap_or_else(|| Transcript::new(thread_id.clone())))
    }

    async fn append(&self, thread_id: &ThreadId, message: Message) -> Result<(), MemoryError> {
        self.extend(thread_id, vec![message]).await
    }

    async fn extend(&self, thread_id: &ThreadId, messages: Vec<Message>) -> Result<(), MemoryError> {
        let mut threads = self.threads.write().await;
        let transcript = threads
            .entry(thread_id.clone())
            .or_insert_with(|| Transcript::new(thread_id.clone()));
        for message in messages {
            transcript.push(message);
        }
        Ok(())
    }

    async fn threads(&self) -> Result<Vec<ThreadId>, MemoryError> {
        let threads = self.threads.read().await;
        let mut ids: Vec<ThreadId> = threads
            .iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
