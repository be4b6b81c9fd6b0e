//! Per-invocation context handed to tools.
//!
//! A `Context` is built by the caller for each turn and threaded through the
//! agent loop to every tool call of that turn. It never enters the transcript
//! and is therefore intentionally not `Serialize`.

/// Caller-supplied data visible only to tool implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Identifier of the end user on whose behalf the turn runs.
    pub user_id: String,
}

impl Context {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
