//! The agent loop of Sunnyside.
//!
//! A turn follows a **Call → Act → Observe** cycle:
//!
//! 1. **Receive** a user message for a thread
//! 2. **Build context** (system prompt + the thread's transcript)
//! 3. **Send to LLM** with the tool schemas and the output schema
//! 4. **If tool calls**: execute tools, append results, loop back to step 3
//! 5. **If structured answer**: validate it, commit the turn, return it
//!
//! The loop continues until the LLM produces a valid structured answer or
//! a termination guard (round limit, turn timeout) fires.

pub mod loop_runner;
pub mod prompt;
pub mod strategy;
pub mod thread_lock;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::AgentLoop;
pub use prompt::DEFAULT_SYSTEM_PROMPT;
pub use strategy::OutputStrategy;
pub use thread_lock::ThreadLocks;
