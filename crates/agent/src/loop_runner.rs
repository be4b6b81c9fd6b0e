//! The agent reasoning loop implementation.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sunnyside_config::AppConfig;
use sunnyside_core::context::Context;
use sunnyside_core::error::AgentError;
use sunnyside_core::event::{DomainEvent, EventBus};
use sunnyside_core::memory::ConversationMemory;
use sunnyside_core::message::{Message, ThreadId};
use sunnyside_core::output::{
    ResponseFormat, StructuredOutput, StructuredOutputFormat, parse_structured_text,
};
use sunnyside_core::provider::{Completion, Provider, ProviderRequest, ToolChoice};
use sunnyside_core::tool::{ToolCall, ToolRegistry, ToolSchema};
use tracing::{debug, info, warn};

use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::strategy::OutputStrategy;
use crate::thread_lock::ThreadLocks;

/// Where a turn currently is.
enum TurnState {
    AwaitingModel,
    ExecutingTool(Vec<ToolCall>),
    Done(serde_json::Value),
}

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per response
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Per-thread transcripts
    memory: Arc<dyn ConversationMemory>,

    system_prompt: String,

    /// Maximum tool call rounds per turn
    max_iterations: u32,

    /// Wall-clock bound on the model and tool phase of a turn
    turn_timeout: Option<Duration>,

    output_strategy: OutputStrategy,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    thread_locks: ThreadLocks,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn ConversationMemory>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.5,
            max_tokens: None,
            tools,
            memory,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: 25,
            turn_timeout: None,
            output_strategy: OutputStrategy::Auto,
            event_bus: Arc::new(EventBus::default()),
            thread_locks: ThreadLocks::new(),
        }
    }

    /// Create an agent loop with the model settings of an [`AppConfig`].
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn ConversationMemory>,
    ) -> Self {
        let strategy = config
            .agent
            .output_strategy
            .parse::<OutputStrategy>()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to automatic output strategy");
                OutputStrategy::Auto
            });

        let mut agent = Self::new(provider, &config.model, tools, memory)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_max_iterations(config.agent.max_iterations)
            .with_output_strategy(strategy);

        if let Some(secs) = config.agent.turn_timeout_secs {
            agent = agent.with_turn_timeout(Duration::from_secs(secs));
        }
        if let Some(prompt) = &config.agent.system_prompt {
            agent = agent.with_system_prompt(prompt);
        }
        agent
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of tool call rounds per turn.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Bound each turn's model and tool phase.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_output_strategy(mut self, strategy: OutputStrategy) -> Self {
        self.output_strategy = strategy;
        self
    }

    /// Publish domain events to a shared bus.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn memory(&self) -> &Arc<dyn ConversationMemory> {
        &self.memory
    }

    /// The strategy actually used with the configured provider.
    pub fn effective_output_strategy(&self) -> OutputStrategy {
        self.output_strategy
            .resolve(self.provider.supports_structured_output())
    }

    /// Run one conversational turn and return the forecaster's answer.
    pub async fn invoke(
        &self,
        thread_id: &ThreadId,
        user_message: impl Into<String>,
        context: &Context,
    ) -> Result<ResponseFormat, AgentError> {
        self.invoke_structured::<ResponseFormat>(thread_id, user_message, context)
            .await
    }

    /// Run one conversational turn ending in any structured output type.
    ///
    /// On success the user message and the validated answer are appended to
    /// the thread's transcript. On failure the transcript is left untouched.
    pub async fn invoke_structured<O: StructuredOutput>(
        &self,
        thread_id: &ThreadId,
        user_message: impl Into<String>,
        context: &Context,
    ) -> Result<O, AgentError> {
        let _guard = self.thread_locks.acquire(thread_id).await;

        info!(thread_id = %thread_id, "Processing turn");
        self.event_bus.publish(DomainEvent::TurnStarted {
            thread_id: thread_id.to_string(),
            timestamp: Utc::now(),
        });

        let user_message = Message::user(user_message);
        let result = self
            .run_turn::<O>(thread_id, user_message, context)
            .await;

        if let Err(e) = &result {
            warn!(thread_id = %thread_id, error = %e, "Turn failed");
            self.event_bus.publish(DomainEvent::TurnFailed {
                thread_id: thread_id.to_string(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        result
    }

    async fn run_turn<O: StructuredOutput>(
        &self,
        thread_id: &ThreadId,
        user_message: Message,
        context: &Context,
    ) -> Result<O, AgentError> {
        let transcript = self.memory.get(thread_id).await?;
        let mut messages = transcript.messages;
        messages.push(user_message.clone());

        let rounds = match self.turn_timeout {
            Some(limit) => tokio::time::timeout(
                limit,
                self.run_rounds::<O>(thread_id, &mut messages, context),
            )
            .await
            .map_err(|_| AgentError::TurnTimedOut(limit))?,
            None => self.run_rounds::<O>(thread_id, &mut messages, context).await,
        };
        let (output, rounds) = rounds?;

        let payload = serde_json::to_value(&output)
            .map_err(|e| AgentError::InvalidStructuredOutput(e.to_string()))?;
        self.memory
            .extend(thread_id, vec![user_message, Message::structured(payload)])
            .await?;

        info!(thread_id = %thread_id, rounds, "Turn completed");
        self.event_bus.publish(DomainEvent::TurnCompleted {
            thread_id: thread_id.to_string(),
            rounds,
            timestamp: Utc::now(),
        });

        Ok(output)
    }

    /// Drive the model until it produces a valid final answer.
    ///
    /// Returns the answer and the number of tool rounds it took. Tool-call
    /// and tool-result messages only live in `messages` for this turn.
    async fn run_rounds<O: StructuredOutput>(
        &self,
        thread_id: &ThreadId,
        messages: &mut Vec<Message>,
        context: &Context,
    ) -> Result<(O, u32), AgentError> {
        let format = O::output_format();
        let strategy = self.effective_output_strategy();
        let (tool_schemas, response_format, tool_choice) = self.advertised(&format, strategy);

        let mut rounds = 0;
        let mut state = TurnState::AwaitingModel;

        loop {
            state = match state {
                TurnState::AwaitingModel => {
                    debug!(thread_id = %thread_id, round = rounds, model = %self.model, "Calling model");

                    let request = ProviderRequest {
                        model: self.model.clone(),
                        system_prompt: self.system_prompt.clone(),
                        messages: messages.clone(),
                        temperature: self.temperature,
                        max_tokens: self.max_tokens,
                        tools: tool_schemas.clone(),
                        response_format: response_format.clone(),
                        tool_choice,
                    };

                    let response = self.provider.complete(request).await?;

                    self.event_bus.publish(DomainEvent::ResponseGenerated {
                        thread_id: thread_id.to_string(),
                        model: response.model.clone(),
                        tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
                        timestamp: Utc::now(),
                    });

                    Self::interpret(response.completion, &format.name, strategy, messages)?
                }

                TurnState::ExecutingTool(calls) => {
                    if rounds >= self.max_iterations {
                        warn!(
                            thread_id = %thread_id,
                            max_iterations = self.max_iterations,
                            "Max tool rounds reached"
                        );
                        return Err(AgentError::MaxIterationsExceeded(self.max_iterations));
                    }
                    rounds += 1;

                    self.execute_tools(thread_id, &calls, context, messages)
                        .await?;
                    TurnState::AwaitingModel
                }

                TurnState::Done(payload) => {
                    let output = O::validate(&payload).map_err(AgentError::InvalidStructuredOutput)?;
                    return Ok((output, rounds));
                }
            };
        }
    }

    /// Tool schemas, native response format and tool choice for a request.
    fn advertised(
        &self,
        format: &StructuredOutputFormat,
        strategy: OutputStrategy,
    ) -> (Vec<ToolSchema>, Option<StructuredOutputFormat>, Option<ToolChoice>) {
        let mut schemas = self.tools.list_schemas();
        match strategy {
            OutputStrategy::Tool => {
                schemas.push(ToolSchema {
                    name: format.name.clone(),
                    description: format
                        .description
                        .clone()
                        .unwrap_or_else(|| "Respond to the user with this structured answer.".into()),
                    parameters: format.schema.clone(),
                });
                // Text cannot end the turn under this strategy.
                (schemas, None, Some(ToolChoice::Any))
            }
            _ => (schemas, Some(format.clone()), None),
        }
    }

    /// Decide the next state from what the model produced.
    fn interpret(
        completion: Completion,
        output_name: &str,
        strategy: OutputStrategy,
        messages: &mut Vec<Message>,
    ) -> Result<TurnState, AgentError> {
        match completion {
            Completion::Structured(payload) => Ok(TurnState::Done(payload)),

            Completion::ToolCalls { content, calls } => {
                if strategy == OutputStrategy::Tool {
                    if let Some(answer) = calls.iter().find(|c| c.name == output_name) {
                        if calls.len() > 1 {
                            return Err(AgentError::InvalidStructuredOutput(format!(
                                "{output_name} must be the only tool call in its response"
                            )));
                        }
                        return Ok(TurnState::Done(answer.arguments.clone()));
                    }
                }
                messages.push(Message::assistant_tool_calls(content, calls.clone()));
                Ok(TurnState::ExecutingTool(calls))
            }

            Completion::Text(text) => match strategy {
                OutputStrategy::Tool => Err(AgentError::InvalidStructuredOutput(format!(
                    "model answered in free text instead of calling {output_name}"
                ))),
                _ => parse_structured_text(&text)
                    .map(TurnState::Done)
                    .map_err(AgentError::InvalidStructuredOutput),
            },
        }
    }

    /// Run one round of tool calls sequentially.
    ///
    /// Every name is checked before anything runs, so a round with an
    /// unknown tool has no side effects.
    async fn execute_tools(
        &self,
        thread_id: &ThreadId,
        calls: &[ToolCall],
        context: &Context,
        messages: &mut Vec<Message>,
    ) -> Result<(), AgentError> {
        if let Some(unknown) = calls.iter().find(|c| !self.tools.contains(&c.name)) {
            warn!(thread_id = %thread_id, tool = %unknown.name, "Model requested unknown tool");
            return Err(AgentError::UnknownTool(unknown.name.clone()));
        }

        debug!(thread_id = %thread_id, tool_count = calls.len(), "Executing tool calls");

        for call in calls {
            let start = Instant::now();
            let result = self
                .tools
                .invoke(&call.name, call.arguments.clone(), context)
                .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            self.event_bus.publish(DomainEvent::ToolExecuted {
                thread_id: thread_id.to_string(),
                tool_name: call.name.clone(),
                success: result.is_ok(),
                duration_ms,
                timestamp: Utc::now(),
            });

            match result {
                Ok(output) => {
                    debug!(thread_id = %thread_id, tool = %call.name, duration_ms, "Tool succeeded");
                    messages.push(Message::tool_result(&call.id, &call.name, output.content));
                }
                Err(e) => {
                    warn!(thread_id = %thread_id, tool = %call.name, error = %e, "Tool execution failed");
                    return Err(AgentError::ToolExecution {
                        tool_name: call.name.clone(),
                        source: e,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use sunnyside_core::error::{ProviderError, ToolError};
    use sunnyside_core::message::Role;
    use sunnyside_core::provider::ProviderResponse;
    use sunnyside_core::tool::{Tool, ToolOutput};
    use sunnyside_memory::InMemoryConversationMemory;

    fn weather_answer() -> serde_json::Value {
        serde_json::json!({
            "punny_response": "Florida is sun-believable today!",
            "weather_conditions": "It's always sunny in Florida!"
        })
    }

    fn thanks_answer() -> serde_json::Value {
        serde_json::json!({
            "punny_response": "You're welcome, it was a breeze!",
            "weather_conditions": null
        })
    }

    fn agent_with(provider: Arc<SequentialMockProvider>) -> (AgentLoop, Arc<InMemoryConversationMemory>) {
        let memory = Arc::new(InMemoryConversationMemory::new());
        let tools = Arc::new(sunnyside_tools::default_registry().unwrap());
        let agent = AgentLoop::new(provider, "mock-model", tools, memory.clone());
        (agent, memory)
    }

    fn scenario_a_script() -> Vec<ProviderResponse> {
        vec![
            make_tool_call_response(vec![make_tool_call("get_user_location", serde_json::json!({}))]),
            make_tool_call_response(vec![make_tool_call(
                "get_weather_for_location",
                serde_json::json!({"city": "Florida"}),
            )]),
            make_structured_response(weather_answer()),
        ]
    }

    #[tokio::test]
    async fn weather_question_runs_both_tools() {
        let provider = Arc::new(SequentialMockProvider::new(scenario_a_script()));
        let (agent, memory) = agent_with(provider.clone());
        let thread = ThreadId::from("1");

        let answer = agent
            .invoke(&thread, "What's the weather outside?", &Context::new("1"))
            .await
            .unwrap();

        assert_eq!(answer.punny_response, "Florida is sun-believable today!");
        assert_eq!(answer.weather_conditions.as_deref(), Some("It's always sunny in Florida!"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(requests[0].tools.len(), 2);
        assert_eq!(
            requests[0].response_format.as_ref().map(|f| f.name.as_str()),
            Some("ResponseFormat")
        );
        assert_eq!(requests[0].tool_choice, None);
        assert_eq!(requests[1].messages.last().unwrap().content(), "Florida");
        assert_eq!(
            requests[2].messages.last().unwrap().content(),
            "It's always sunny in Florida!"
        );

        let transcript = memory.get(&thread).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages[0].role(), Role::User);
        assert_eq!(
            transcript.messages[1].structured_payload().unwrap()["weather_conditions"],
            "It's always sunny in Florida!"
        );
    }

    #[tokio::test]
    async fn follow_up_sees_previous_turn() {
        let mut script = scenario_a_script();
        script.push(make_structured_response(thanks_answer()));
        let provider = Arc::new(SequentialMockProvider::new(script));
        let (agent, memory) = agent_with(provider.clone());
        let thread = ThreadId::from("1");
        let ctx = Context::new("1");

        agent.invoke(&thread, "What's the weather outside?", &ctx).await.unwrap();
        let answer = agent.invoke(&thread, "Thank you!", &ctx).await.unwrap();

        assert_eq!(answer.weather_conditions, None);

        let last_request = provider.requests().pop().unwrap();
        assert_eq!(last_request.messages.len(), 3);
        assert_eq!(
            last_request.messages[1].structured_payload(),
            Some(&weather_answer())
        );
        assert_eq!(last_request.messages[2].content(), "Thank you!");

        let transcript = memory.get(&thread).await.unwrap();
        assert_eq!(transcript.len(), 4);
        assert!(transcript.iter().all(|m| m.tool_calls().is_empty()));
    }

    #[tokio::test]
    async fn fenced_json_text_is_accepted_natively() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response(
            "```json\n{\"punny_response\": \"Hi there, sunshine!\"}\n```",
        )]));
        let (agent, _) = agent_with(provider);

        let answer = agent
            .invoke(&ThreadId::from("t"), "hi", &Context::new("2"))
            .await
            .unwrap();
        assert_eq!(answer.punny_response, "Hi there, sunshine!");
        assert_eq!(answer.weather_conditions, None);
    }

    #[tokio::test]
    async fn invalid_output_leaves_memory_untouched() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_structured_response(serde_json::json!({"forecast": "rain"})),
            make_text_response("It is raining cats and dogs."),
            make_structured_response(serde_json::json!({"punny_response": "   "})),
        ]));
        let (agent, memory) = agent_with(provider);
        let thread = ThreadId::from("1");
        let ctx = Context::new("1");

        for _ in 0..3 {
            let err = agent.invoke(&thread, "weather?", &ctx).await.unwrap_err();
            assert!(matches!(err, AgentError::InvalidStructuredOutput(_)), "{err}");
        }
        assert!(memory.get(&thread).await.unwrap().is_empty());
    }

    struct CountingTool(Arc<AtomicU32>);

    #[async_trait::async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "count"
        }
        fn description(&self) -> &str {
            "Counts invocations"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _: serde_json::Value, _: &Context) -> Result<ToolOutput, ToolError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ToolOutput::text("counted"))
        }
    }

    #[tokio::test]
    async fn unknown_tool_fails_before_any_tool_runs() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CountingTool(counter.clone()))).unwrap();

        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(vec![
            make_tool_call("count", serde_json::json!({})),
            make_tool_call("launch_rockets", serde_json::json!({})),
        ])]));
        let memory = Arc::new(InMemoryConversationMemory::new());
        let agent = AgentLoop::new(provider, "mock-model", Arc::new(registry), memory.clone());

        let err = agent
            .invoke(&ThreadId::from("1"), "go", &Context::new("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::UnknownTool(ref name) if name == "launch_rockets"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(memory.threads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tool_failure_is_fatal() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(vec![
            make_tool_call("get_weather_for_location", serde_json::json!({})),
        ])]));
        let (agent, memory) = agent_with(provider.clone());

        let err = agent
            .invoke(&ThreadId::from("1"), "weather?", &Context::new("1"))
            .await
            .unwrap_err();

        match err {
            AgentError::ToolExecution { tool_name, source } => {
                assert_eq!(tool_name, "get_weather_for_location");
                assert!(matches!(source, ToolError::InvalidArguments(_)));
            }
            other => panic!("expected ToolExecution, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 1);
        assert!(memory.threads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn round_limit_is_enforced() {
        let call = || make_tool_call_response(vec![make_tool_call("get_user_location", serde_json::json!({}))]);
        let provider = Arc::new(SequentialMockProvider::new(vec![call(), call(), call()]));
        let (agent, memory) = agent_with(provider.clone());
        let agent = agent.with_max_iterations(2);

        let err = agent
            .invoke(&ThreadId::from("1"), "loop forever", &Context::new("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::MaxIterationsExceeded(2)));
        assert_eq!(provider.call_count(), 3);
        assert!(memory.threads().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn turn_timeout_is_enforced() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![make_structured_response(thanks_answer())])
                .with_delay(Duration::from_secs(30)),
        );
        let (agent, memory) = agent_with(provider);
        let agent = agent.with_turn_timeout(Duration::from_secs(5));

        let err = agent
            .invoke(&ThreadId::from("1"), "hello?", &Context::new("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::TurnTimedOut(d) if d == Duration::from_secs(5)));
        assert!(memory.threads().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_reports_exact_limit() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![make_structured_response(thanks_answer())])
                .with_delay(Duration::from_secs(1)),
        );
        let (agent, _memory) = agent_with(provider);
        let agent = agent.with_turn_timeout(Duration::from_millis(250));

        let err = agent
            .invoke(&ThreadId::from("1"), "hello?", &Context::new("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::TurnTimedOut(d) if d == Duration::from_millis(250)));
        assert_eq!(err.to_string(), "Turn timed out after 250ms");
    }

    #[tokio::test]
    async fn provider_failure_is_service_unavailable() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![Err(
            ProviderError::Network("connection refused".into()),
        )]));
        let (agent, memory) = agent_with(provider);
        let mut events = agent.event_bus().subscribe();

        let err = agent
            .invoke(&ThreadId::from("1"), "hello?", &Context::new("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ServiceUnavailable(ProviderError::Network(_))));
        assert!(memory.threads().await.unwrap().is_empty());

        assert!(matches!(events.recv().await.unwrap().as_ref(), DomainEvent::TurnStarted { .. }));
        assert!(matches!(events.recv().await.unwrap().as_ref(), DomainEvent::TurnFailed { .. }));
    }

    #[tokio::test]
    async fn tool_strategy_advertises_output_tool() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![
                make_tool_call_response(vec![make_tool_call("get_user_location", serde_json::json!({}))]),
                make_tool_call_response(vec![make_tool_call("ResponseFormat", thanks_answer())]),
            ])
            .without_structured_output(),
        );
        let (agent, memory) = agent_with(provider.clone());
        assert_eq!(agent.effective_output_strategy(), OutputStrategy::Tool);

        let answer = agent
            .invoke(&ThreadId::from("1"), "where am I?", &Context::new("2"))
            .await
            .unwrap();
        assert_eq!(answer.punny_response, "You're welcome, it was a breeze!");

        let first = &provider.requests()[0];
        assert!(first.response_format.is_none());
        assert_eq!(first.tools.len(), 3);
        assert_eq!(first.tools[2].name, "ResponseFormat");
        assert!(provider.requests().iter().all(|r| r.tool_choice == Some(ToolChoice::Any)));

        // The output tool call is the answer, not a transcript entry.
        let transcript = memory.get(&ThreadId::from("1")).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert!(transcript.messages[1].tool_calls().is_empty());
    }

    #[tokio::test]
    async fn tool_strategy_rejects_mixed_or_text_answers() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![
                make_tool_call_response(vec![
                    make_tool_call("get_user_location", serde_json::json!({})),
                    make_tool_call("ResponseFormat", thanks_answer()),
                ]),
                make_text_response("{\"punny_response\": \"plain text\"}"),
            ])
            .without_structured_output(),
        );
        let (agent, memory) = agent_with(provider);
        let thread = ThreadId::from("1");
        let ctx = Context::new("1");

        for _ in 0..2 {
            let err = agent.invoke(&thread, "hi", &ctx).await.unwrap_err();
            assert!(matches!(err, AgentError::InvalidStructuredOutput(_)), "{err}");
        }
        assert!(memory.get(&thread).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_trace_a_successful_turn() {
        let provider = Arc::new(SequentialMockProvider::new(scenario_a_script()));
        let (agent, _) = agent_with(provider);
        let mut events = agent.event_bus().subscribe();

        agent
            .invoke(&ThreadId::from("1"), "What's the weather outside?", &Context::new("1"))
            .await
            .unwrap();

        let mut tools = Vec::new();
        let mut completed_rounds = None;
        while let Ok(event) = events.try_recv() {
            match event.as_ref() {
                DomainEvent::ToolExecuted { tool_name, success, .. } => {
                    assert!(success);
                    tools.push(tool_name.clone());
                }
                DomainEvent::TurnCompleted { rounds, .. } => completed_rounds = Some(*rounds),
                _ => {}
            }
        }
        assert_eq!(tools, vec!["get_user_location", "get_weather_for_location"]);
        assert_eq!(completed_rounds, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn same_thread_turns_are_serialized() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![
                make_structured_response(thanks_answer()),
                make_structured_response(thanks_answer()),
            ])
            .with_delay(Duration::from_millis(100)),
        );
        let (agent, memory) = agent_with(provider.clone());
        let thread = ThreadId::from("shared");
        let ctx = Context::new("1");

        let (a, b) = futures::join!(
            agent.invoke(&thread, "first", &ctx),
            agent.invoke(&thread, "second", &ctx)
        );
        a.unwrap();
        b.unwrap();

        let mut seen: Vec<usize> = provider.requests().iter().map(|r| r.messages.len()).collect();
        seen.sort();
        assert_eq!(seen, vec![1, 3]);

        let roles: Vec<Role> = memory.get(&thread).await.unwrap().iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
    }

    #[test]
    fn from_config_applies_agent_settings() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 3;
        config.agent.turn_timeout_secs = Some(7);
        config.agent.system_prompt = Some("Be brief.".into());
        config.agent.output_strategy = "tool".into();

        let provider = Arc::new(SequentialMockProvider::new(Vec::new()));
        let agent = AgentLoop::from_config(
            &config,
            provider,
            Arc::new(ToolRegistry::new()),
            Arc::new(InMemoryConversationMemory::new()),
        );

        assert_eq!(agent.max_iterations, 3);
        assert_eq!(agent.turn_timeout, Some(Duration::from_secs(7)));
        assert_eq!(agent.system_prompt, "Be brief.");
        assert_eq!(agent.model, config.model);
        assert_eq!(agent.effective_output_strategy(), OutputStrategy::Tool);
    }
}
