//! File-based conversation memory — one JSON-lines file per thread.
//!
//! Each line is a JSON-encoded `Message`. Appends open the file in append
//! mode, so a committed turn is durable as soon as `extend` returns.
//!
//! Storage location: `~/.sunnyside/threads/<thread>.jsonl` by default.
//! Thread identifiers are percent-encoded into file names so any string
//! is a valid identifier.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use sunnyside_core::error::MemoryError;
use sunnyside_core::memory::ConversationMemory;
use sunnyside_core::message::{Message, ThreadId, Transcript};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

const EXTENSION: &str = "jsonl";

/// A file-backed conversation store.
pub struct FileConversationMemory {
    dir: PathBuf,
    /// Serializes writers so batches from one `extend` stay contiguous.
    write_lock: Mutex<()>,
}

impl FileConversationMemory {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(path = %dir.display(), "File conversation memory opened");
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn thread_path(&self, thread_id: &ThreadId) -> PathBuf {
        self.dir
            .join(format!("{}.{EXTENSION}", encode_file_stem(thread_id.as_str())))
    }
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Percent-encode everything outside `[A-Za-z0-9_-]`.
fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if is_plain(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn storage_error(action: &str, path: &Path, e: std::io::Error) -> MemoryError {
    MemoryError::Storage(format!("Failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl ConversationMemory for FileConversationMemory {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, thread_id: &ThreadId) -> Result<Transcript, MemoryError> {
        let path = self.thread_path(thread_id);
        let mut transcript = Transcript::new(thread_id.clone());

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(transcript),
            Err(e) => return Err(storage_error("read", &path, e)),
        };

        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let message: Message =
                serde_json::from_str(line).map_err(|e| MemoryError::Corrupted {
                    thread_id: thread_id.to_string(),
                    reason: format!("line {}: {e}", line_no + 1),
                })?;
            transcript.push(message);
        }

        if let Some(first) = transcript.messages.first() {
            transcript.created_at = first.timestamp();
        }
        if let Some(last) = transcript.last() {
            transcript.updated_at = last.timestamp();
        }

        Ok(transcript)
    }

    async fn append(&self, thread_id: &ThreadId, message: Message) -> Result<(), MemoryError> {
        self.extend(thread_id, vec![message]).await
    }

    async fn extend(&self, thread_id: &ThreadId, messages: Vec<Message>) -> Result<(), MemoryError> {
        let mut buffer = String::new();
        for message in &messages {
            let line = serde_json::to_string(message)
                .map_err(|e| MemoryError::Storage(format!("Failed to serialize message: {e}")))?;
            buffer.push_str(&line);
            buffer.push('\n');
        }

        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_error("create", &self.dir, e))?;

        let path = self.thread_path(thread_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| storage_error("open", &path, e))?;

        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| storage_error("write", &path, e))?;
        file.flush()
            .await
            .map_err(|e| storage_error("flush", &path, e))?;

        let ids: Vec<&str> = messages.iter().map(Message::id).collect();
        debug!(thread_id = %thread_id, message_ids = ?ids, "Messages persisted");
        Ok(())
    }

    async fn threads(&self) -> Result<Vec<ThreadId>, MemoryError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error("list", &self.dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("list", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if entry.metadata().await.map(|m| m.len() == 0).unwrap_or(true) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_file_stem)
            {
                ids.push(ThreadId::from(id));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_stems_roundtrip() {
        for id in ["1", "user-42_a", "a/b c", "../etc/passwd", "ünïcødé", "50%"] {
            let stem = encode_file_stem(id);
            assert!(stem.bytes().all(|b| is_plain(b) || b == b'%'), "{stem}");
            assert_eq!(decode_file_stem(&stem).as_deref(), Some(id));
        }
    }

    #[tokio::test]
    async fn missing_thread_is_empty() {
        let dir = TempDir::new().unwrap();
        let memory = FileConversationMemory::new(dir.path().join("threads"));
        assert!(memory.get(&ThreadId::from("1")).await.unwrap().is_empty());
        assert!(memory.threads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let id = ThreadId::from("1");
        let turn = vec![
            Message::user("what is the weather outside?"),
            Message::structured(serde_json::json!({
                "punny_response": "Florida is sun-sational!",
                "weather_conditions": "It's always sunny in Florida!"
            })),
        ];
        let written_ids: Vec<String> = turn.iter().map(|m| m.id().to_string()).collect();

        {
            let memory = FileConversationMemory::new(dir.path());
            memory.extend(&id, turn).await.unwrap();
        }

        let memory = FileConversationMemory::new(dir.path());
        let transcript = memory.get(&id).await.unwrap();
        assert_eq!(transcript.len(), 2);
        let read_ids: Vec<&str> = transcript.iter().map(Message::id).collect();
        assert_eq!(read_ids, written_ids);
        assert_eq!(
            transcript.messages[1].structured_payload().unwrap()["punny_response"],
            "Florida is sun-sational!"
        );
        assert_eq!(memory.threads().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn odd_thread_ids_stay_inside_the_directory() {
        let dir = TempDir::new().unwrap();
        let memory = FileConversationMemory::new(dir.path());
        let id = ThreadId::from("../escape");

        memory.append(&id, Message::user("hi")).await.unwrap();

        assert!(memory.thread_path(&id).starts_with(dir.path()));
        assert_eq!(memory.threads().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn corrupted_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let memory = FileConversationMemory::new(dir.path());
        let id = ThreadId::from("broken");

        memory.append(&id, Message::user("ok")).await.unwrap();
        let path = memory.thread_path(&id);
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n");
        std::fs::write(&path, content).unwrap();

        let err = memory.get(&id).await.unwrap_err();
        assert!(matches!(err, MemoryError::Corrupted { ref thread_id, .. } if thread_id == "broken"));
    }
}
