//! The agent reasoning loop implementation.
//!
//! One call to [`AgentLoop::run_turn`] moves a single user input through
//! Collect → Infer → Parse → (Act → Infer)* → Respond → Persist. The
//! session is only touched at Respond, so a turn that fails or is
//! cancelled earlier leaves it exactly as it was.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use toolpilot_config::AppConfig;
use toolpilot_core::error::ProviderError;
use toolpilot_core::memory::{ContextRecord, ContextStore};
use toolpilot_core::message::{Session, Turn};
use toolpilot_core::provider::{Provider, ProviderRequest, ProviderResponse};
use toolpilot_core::tool::{ToolRegistry, ToolResult};
use tracing::{debug, info, warn};

use crate::executor::ToolExecutor;
use crate::parser::{self, ParseFailure, ParsedResponse};
use crate::prompt;
use crate::retriever::{ContextRetriever, RetrievalError, RetrieverConfig};
use crate::stream_event::TurnEvent;

/// Appended to the reply when the model keeps calling tools past the bound.
pub const TRUNCATION_NOTICE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// Everything a finished turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The final assistant reply
    pub response: String,
    /// One result per executed tool call, in execution order
    pub tool_results: Vec<ToolResult>,
    /// Skipped `<tool_call>` blocks across all iterations
    pub parse_failures: Vec<ParseFailure>,
    /// Past exchanges recalled into the system prompt
    pub context: Vec<ContextRecord>,
    /// Number of model calls made
    pub iterations: usize,
    /// The iteration bound cut the tool loop short
    pub truncated: bool,
    /// Exchange number within the session
    pub sequence: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Model endpoint failed: {0}")]
    Endpoint(#[from] ProviderError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Turn cancelled")]
    Cancelled,

    /// The reply was produced and committed to the session but could not be
    /// saved to the context store.
    #[error("Reply could not be saved to memory: {source}")]
    Persist {
        outcome: Box<TurnOutcome>,
        source: RetrievalError,
    },
}

impl TurnError {
    /// Whether retrying the same input may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Endpoint(e) => e.is_retryable(),
            Self::Retrieval(e) | Self::Persist { source: e, .. } => e.is_retryable(),
            Self::Cancelled => true,
        }
    }
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    executor: ToolExecutor,

    /// Present only when memory is enabled
    retriever: Option<ContextRetriever>,

    /// Replaces the built-in tool-calling instructions
    instructions: Option<String>,

    /// Maximum model calls per turn
    max_iterations: usize,

    /// Session turns replayed to the model
    history_window: usize,

    request_timeout: Duration,
    events: Option<UnboundedSender<TurnEvent>>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            executor: ToolExecutor::new(tools, Duration::from_secs(60)),
            retriever: None,
            instructions: None,
            max_iterations: 5,
            history_window: 10,
            request_timeout: Duration::from_secs(120),
            events: None,
        }
    }

    /// Build a loop from application config. `store` is ignored when
    /// memory is disabled.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        store: Option<Arc<dyn ContextStore>>,
    ) -> Self {
        let request_timeout = Duration::from_secs(config.ollama.request_timeout_secs);
        let mut agent = Self::new(provider.clone(), &config.ollama.model, tools)
            .with_temperature(config.ollama.temperature)
            .with_max_iterations(config.agent.max_iterations)
            .with_history_window(config.agent.history_window)
            .with_tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs))
            .with_request_timeout(request_timeout);

        if let Some(instructions) = &config.agent.system_prompt {
            agent = agent.with_instructions(instructions.clone());
        }

        if config.memory.enabled
            && let Some(store) = store
        {
            let retriever = ContextRetriever::new(
                provider,
                store,
                RetrieverConfig {
                    result_limit: config.memory.n_contexts,
                    similarity_threshold: config.memory.similarity_threshold,
                    embed_model: config.ollama.embed_model.clone(),
                    timeout: request_timeout,
                },
            );
            agent = agent.with_retriever(retriever);
        }
        agent
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of model calls per turn.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.executor = ToolExecutor::new(self.executor.registry().clone(), timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Attach a retriever for context recall and exchange persistence.
    pub fn with_retriever(mut self, retriever: ContextRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Stream [`TurnEvent`]s to `sender` while turns run.
    pub fn with_events(mut self, sender: UnboundedSender<TurnEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retriever(&self) -> Option<&ContextRetriever> {
        self.retriever.as_ref()
    }

    /// Process one user input and return the final reply.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        info!(session_id = %session.id, turns = session.len(), "Processing turn");

        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }

        // ── Collect ──
        let context = match &self.retriever {
            Some(retriever) => cancellable(cancel, retriever.retrieve(input)).await??,
            None => Vec::new(),
        };
        if !context.is_empty() {
            debug!(count = context.len(), "Recalled past exchanges");
            self.emit(TurnEvent::ContextRecalled {
                count: context.len(),
            });
        }

        let system_prompt = prompt::build_system_prompt(
            self.instructions.as_deref(),
            &self.tools().specs(),
            &context,
        );
        let user_turn = Turn::user(input);

        let mut transcript = vec![Turn::system(system_prompt)];
        transcript.extend(session.recent(self.history_window));
        transcript.push(user_turn.clone());

        let mut tool_results = Vec::new();
        let mut parse_failures = Vec::new();
        let mut last_prose = String::new();
        let mut iterations = 0;

        let (response, truncated) = loop {
            if iterations >= self.max_iterations {
                warn!(
                    session_id = %session.id,
                    iterations,
                    "Max tool iterations reached, forcing text response"
                );
                self.emit(TurnEvent::Truncated { iterations });
                let response = if last_prose.is_empty() {
                    TRUNCATION_NOTICE.to_string()
                } else {
                    format!("{last_prose}\n\n{TRUNCATION_NOTICE}")
                };
                break (response, true);
            }

            iterations += 1;
            debug!(session_id = %session.id, iteration = iterations, "Agent loop iteration");
            self.emit(TurnEvent::Thinking {
                iteration: iterations,
            });

            // ── Infer ──
            let reply = self.infer(&transcript, cancel).await?;

            // ── Parse ──
            let ParsedResponse {
                text,
                calls,
                failures,
            } = parser::parse(&reply.content);
            for failure in failures {
                self.emit(TurnEvent::ParseFailure {
                    failure: failure.clone(),
                });
                parse_failures.push(failure);
            }

            if calls.is_empty() {
                let response = if text.is_empty() {
                    reply.content.trim().to_string()
                } else {
                    text
                };
                break (response, false);
            }

            // ── Act ──
            debug!(tool_count = calls.len(), "Executing tool calls");
            transcript.push(Turn::assistant(reply.content));

            for request in calls {
                if cancel.is_cancelled() {
                    return Err(TurnError::Cancelled);
                }
                self.emit(TurnEvent::ToolCall {
                    id: request.id.clone(),
                    name: request.name.clone(),
                    arguments: serde_json::Value::Object(request.arguments.clone()),
                });

                let result = cancellable(cancel, self.executor.execute(request)).await?;
                self.emit(TurnEvent::ToolResult {
                    result: result.clone(),
                });
                transcript.push(Turn::tool(result.clone()));
                tool_results.push(result);
            }

            last_prose = text;
        };

        // ── Respond ──
        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }

        let mut committed = Vec::with_capacity(tool_results.len() + 2);
        committed.push(user_turn);
        committed.extend(tool_results.iter().cloned().map(Turn::tool));
        committed.push(Turn::assistant(response.clone()));
        let sequence = session.commit_exchange(committed);

        let outcome = TurnOutcome {
            response,
            tool_results,
            parse_failures,
            context,
            iterations,
            truncated,
            sequence,
        };

        // ── Persist ──
        if let Some(retriever) = &self.retriever
            && let Err(source) = retriever
                .remember(session.id.as_str(), sequence, input, &outcome.response)
                .await
        {
            warn!(session_id = %session.id, sequence, error = %source, "Failed to persist exchange");
            return Err(TurnError::Persist {
                outcome: Box::new(outcome),
                source,
            });
        }

        info!(
            session_id = %session.id,
            sequence,
            iterations = outcome.iterations,
            tool_calls = outcome.tool_results.len(),
            truncated = outcome.truncated,
            "Turn complete"
        );
        Ok(outcome)
    }

    async fn infer(
        &self,
        transcript: &[Turn],
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, TurnError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            turns: transcript.to_vec(),
            temperature: self.temperature,
        };

        let call = tokio::time::timeout(self.request_timeout, self.provider.complete(request));
        match cancellable(cancel, call).await? {
            Ok(Ok(response)) => {
                if let Some(usage) = response.usage {
                    debug!(
                        model = %response.model,
                        total_tokens = usage.total_tokens,
                        "Model responded"
                    );
                }
                Ok(response)
            }
            Ok(Err(e)) => Err(TurnError::Endpoint(e)),
            Err(_) => Err(TurnError::Endpoint(ProviderError::Timeout(format!(
                "no response from '{}' within {}s",
                self.model,
                self.request_timeout.as_secs()
            )))),
        }
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(sender) = &self.events {
            // receiver gone means nobody is watching
            let _ = sender.send(event);
        }
    }
}

/// Run `future` unless `cancel` fires first.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, TurnError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TurnError::Cancelled),
        output = future => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, tool_call_block};
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use toolpilot_core::error::{StoreError, ToolError};
    use toolpilot_core::message::Role;
    use toolpilot_core::provider::{EmbeddingRequest, EmbeddingResponse};
    use toolpilot_core::tool::{ArgumentSchema, FailureKind, ParamKind, Tool, ToolOutput};
    use toolpilot_memory::InMemoryStore;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the text back"
        }
        fn schema(&self) -> ArgumentSchema {
            ArgumentSchema::new().required("text", ParamKind::String, "Text to echo")
        }
        async fn execute(&self, arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text(arguments["text"].as_str().unwrap_or_default()))
        }
    }

    /// Cancels the turn it runs in.
    struct AbortTool(CancellationToken);

    #[async_trait]
    impl Tool for AbortTool {
        fn name(&self) -> &str {
            "abort"
        }
        fn description(&self) -> &str {
            "Cancels the current turn"
        }
        fn schema(&self) -> ArgumentSchema {
            ArgumentSchema::new()
        }
        async fn execute(&self, _arguments: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
            self.0.cancel();
            Ok(ToolOutput::text("cancelled"))
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        Arc::new(registry)
    }

    fn agent_with_memory(
        provider: Arc<SequentialMockProvider>,
        store: Arc<InMemoryStore>,
    ) -> AgentLoop {
        let retriever = ContextRetriever::new(
            provider.clone(),
            store,
            RetrieverConfig {
                result_limit: 3,
                similarity_threshold: 0.7,
                ..Default::default()
            },
        );
        AgentLoop::new(provider, "mock-model", registry()).with_retriever(retriever)
    }

    #[tokio::test]
    async fn plain_answer_commits_and_persists() {
        let provider = Arc::new(SequentialMockProvider::replies(&["Hello! How can I help?"]));
        let store = Arc::new(InMemoryStore::new());
        let agent = agent_with_memory(provider.clone(), store.clone());

        let mut session = Session::new();
        let outcome = agent
            .run_turn(&mut session, "Hello!", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.response, "Hello! How can I help?");
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.sequence, 1);
        assert!(!outcome.truncated);

        let roles: Vec<_> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);

        let records = store.session_records(session.id.as_str()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt, "Hello!");
        assert_eq!(records[0].response, "Hello! How can I help?");

        let request = &provider.requests()[0];
        assert_eq!(request.turns[0].role, Role::System);
        assert!(request.turns[0].content.contains("\"name\":\"echo\""));
        assert_eq!(request.turns.last().unwrap().content, "Hello!");
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_to_the_model() {
        let first = format!("Let me echo that.\n{}", tool_call_block("echo", json!({"text": "ping"})));
        let provider = Arc::new(SequentialMockProvider::replies(&[&first, "The tool said ping."]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", registry());

        let mut session = Session::new();
        let outcome = agent
            .run_turn(&mut session, "echo ping", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.response, "The tool said ping.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_results.len(), 1);
        assert!(outcome.tool_results[0].success);
        assert_eq!(outcome.tool_results[0].output, "ping");

        let second = &provider.requests()[1];
        let tool_turn = second.turns.last().unwrap();
        assert_eq!(tool_turn.role, Role::Tool);
        assert!(tool_turn.content.starts_with("<tool_response>"));
        assert!(tool_turn.content.contains("ping"));

        let roles: Vec<_> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);
    }

    #[tokio::test]
    async fn unknown_tool_does_not_fail_the_turn() {
        let first = tool_call_block("teleport", json!({"to": "mars"}));
        let provider = Arc::new(SequentialMockProvider::replies(&[&first, "I can't do that."]));
        let agent = AgentLoop::new(provider, "mock-model", registry());

        let mut session = Session::new();
        let outcome = agent
            .run_turn(&mut session, "go to mars", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.tool_results[0].failure, Some(FailureKind::UnknownTool));
        assert_eq!(outcome.response, "I can't do that.");
    }

    #[tokio::test]
    async fn parse_failures_are_reported() {
        let first = format!(
            "<tool_call>{{\"name\": \"echo\", \"arguments\": </tool_call>\n{}",
            tool_call_block("echo", json!({"text": "ok"}))
        );
        let provider = Arc::new(SequentialMockProvider::replies(&[&first, "done"]));
        let agent = AgentLoop::new(provider, "mock-model", registry());

        let outcome = agent
            .run_turn(&mut Session::new(), "hi", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.parse_failures.len(), 1);
        assert_eq!(outcome.tool_results.len(), 1);
        assert!(outcome.tool_results[0].success);
    }

    #[tokio::test]
    async fn iteration_bound_truncates() {
        let call = format!("Still working.\n{}", tool_call_block("echo", json!({"text": "again"})));
        let provider = Arc::new(SequentialMockProvider::replies(&[&call, &call]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", registry()).with_max_iterations(2);

        let mut session = Session::new();
        let outcome = agent
            .run_turn(&mut session, "loop forever", &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.truncated);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(outcome.tool_results.len(), 2);
        assert!(outcome.response.starts_with("Still working."));
        assert!(outcome.response.ends_with(TRUNCATION_NOTICE));
        assert_eq!(session.exchange_count(), 1);
    }

    struct DownProvider;

    #[async_trait]
    impl Provider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }
        async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
        async fn embed(&self, _r: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: vec![vec![1.0, 0.0]],
                model: "embed".into(),
            })
        }
    }

    #[tokio::test]
    async fn endpoint_failure_leaves_session_untouched() {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(DownProvider);
        let retriever = ContextRetriever::new(provider.clone(), store.clone(), RetrieverConfig::default());
        let agent = AgentLoop::new(provider, "mock-model", registry()).with_retriever(retriever);

        let mut session = Session::new();
        let err = agent
            .run_turn(&mut session, "hello", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Endpoint(_)));
        assert!(err.is_retryable());
        assert!(session.is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let provider = Arc::new(SequentialMockProvider::replies(&["unused"]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", registry());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut session = Session::new();
        let err = agent.run_turn(&mut session, "hi", &cancel).await.unwrap_err();
        assert!(matches!(err, TurnError::Cancelled));
        assert_eq!(provider.call_count(), 0);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn cancellation_during_act_never_persists() {
        let cancel = CancellationToken::new();
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(AbortTool(cancel.clone()))).unwrap();

        let provider = Arc::new(SequentialMockProvider::replies(&[&tool_call_block("abort", json!({}))]));
        let store = Arc::new(InMemoryStore::new());
        let retriever = ContextRetriever::new(provider.clone(), store.clone(), RetrieverConfig::default());
        let agent = AgentLoop::new(provider, "mock-model", Arc::new(tools)).with_retriever(retriever);

        let mut session = Session::new();
        let err = agent.run_turn(&mut session, "stop", &cancel).await.unwrap_err();

        assert!(matches!(err, TurnError::Cancelled));
        assert!(session.is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recalled_context_and_history_reach_the_model() {
        let provider = Arc::new(SequentialMockProvider::replies(&[
            "helix is your favourite editor",
            "Still helix.",
        ]));
        let store = Arc::new(InMemoryStore::new());
        let agent = agent_with_memory(provider.clone(), store);

        let mut session = Session::new();
        let cancel = CancellationToken::new();
        agent
            .run_turn(&mut session, "what is my favourite editor", &cancel)
            .await
            .unwrap();
        let outcome = agent
            .run_turn(&mut session, "what is my favourite editor", &cancel)
            .await
            .unwrap();

        assert_eq!(outcome.context.len(), 1);
        assert_eq!(outcome.sequence, 2);

        let second = &provider.requests()[1];
        assert!(second.turns[0].content.contains("Relevant past conversations:"));
        assert!(second.turns[0].content.contains("Assistant: helix is your favourite editor"));
        // system, previous user, previous assistant, new user
        assert_eq!(second.turns.len(), 4);
        assert_eq!(session.len(), 4);
    }

    #[tokio::test]
    async fn history_window_limits_replayed_turns() {
        let replies: Vec<String> = (0..4).map(|i| format!("reply {i}")).collect();
        let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let provider = Arc::new(SequentialMockProvider::replies(&refs));
        let agent = AgentLoop::new(provider.clone(), "mock-model", registry()).with_history_window(2);

        let mut session = Session::new();
        let cancel = CancellationToken::new();
        for i in 0..4 {
            agent
                .run_turn(&mut session, &format!("message {i}"), &cancel)
                .await
                .unwrap();
        }

        let last = &provider.requests()[3];
        assert_eq!(last.turns.len(), 4);
        assert_eq!(last.turns[1].content, "message 2");
        assert_eq!(last.turns[2].content, "reply 2");
        assert_eq!(session.exchange_count(), 4);
    }

    #[tokio::test]
    async fn history_window_drops_partial_exchanges() {
        let call = tool_call_block("echo", json!({"text": "ping"}));
        let provider = Arc::new(SequentialMockProvider::replies(&[
            &call,
            "first done",
            &call,
            "second done",
            "third done",
        ]));
        let agent = AgentLoop::new(provider.clone(), "mock-model", registry()).with_history_window(4);

        let mut session = Session::new();
        let cancel = CancellationToken::new();
        for input in ["first", "second", "third"] {
            agent.run_turn(&mut session, input, &cancel).await.unwrap();
        }

        // Four turns back from the end lands on the first exchange's reply;
        // the window skips it and starts at the second user turn.
        let last = &provider.requests()[4];
        let replayed: Vec<_> = last.turns[1..last.turns.len() - 1]
            .iter()
            .map(|t| (t.role, t.content.as_str()))
            .collect();
        assert_eq!(replayed.len(), 3);
        assert_eq!(replayed[0], (Role::User, "second"));
        assert_eq!(replayed[1].0, Role::Tool);
        assert_eq!(replayed[2], (Role::Assistant, "second done"));
        assert_eq!(last.turns.last().unwrap().content, "third");
    }

    #[tokio::test]
    async fn persist_failure_still_returns_the_reply() {
        struct ReadOnly;

        #[async_trait]
        impl ContextStore for ReadOnly {
            fn name(&self) -> &str {
                "read_only"
            }
            async fn put(&self, _record: ContextRecord) -> Result<(), StoreError> {
                Err(StoreError::Storage("disk full".into()))
            }
            async fn query(&self, _e: &[f32], _l: usize) -> Result<Vec<ContextRecord>, StoreError> {
                Ok(vec![])
            }
            async fn session_records(&self, _s: &str) -> Result<Vec<ContextRecord>, StoreError> {
                Ok(vec![])
            }
            async fn count(&self) -> Result<usize, StoreError> {
                Ok(0)
            }
            async fn clear(&self) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let provider = Arc::new(SequentialMockProvider::replies(&["answer"]));
        let retriever = ContextRetriever::new(provider.clone(), Arc::new(ReadOnly), RetrieverConfig::default());
        let agent = AgentLoop::new(provider, "mock-model", registry()).with_retriever(retriever);

        let mut session = Session::new();
        let err = agent
            .run_turn(&mut session, "question", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            TurnError::Persist { outcome, source } => {
                assert_eq!(outcome.response, "answer");
                assert!(source.to_string().contains("disk full"));
            }
            other => panic!("expected Persist, got {other:?}"),
        }
        assert_eq!(session.exchange_count(), 1);
    }

    #[tokio::test]
    async fn events_follow_the_turn() {
        let first = tool_call_block("echo", json!({"text": "hi"}));
        let provider = Arc::new(SequentialMockProvider::replies(&[&first, "done"]));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let agent = AgentLoop::new(provider, "mock-model", registry()).with_events(tx);

        agent
            .run_turn(&mut Session::new(), "hi", &CancellationToken::new())
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event_type());
        }
        assert_eq!(kinds, vec!["thinking", "tool_call", "tool_result", "thinking"]);
    }

    #[test]
    fn from_config_respects_memory_switch() {
        let provider: Arc<dyn Provider> = Arc::new(SequentialMockProvider::new(vec![]));
        let store: Arc<dyn ContextStore> = Arc::new(InMemoryStore::new());

        let mut config = AppConfig::default();
        let agent = AgentLoop::from_config(&config, provider.clone(), registry(), Some(store.clone()));
        assert!(agent.retriever().is_some());
        assert_eq!(agent.model(), config.ollama.model);

        config.memory.enabled = false;
        let agent = AgentLoop::from_config(&config, provider, registry(), Some(store));
        assert!(agent.retriever().is_none());
    }
}
