//! Runs parsed tool requests against the registry.
//!
//! Requests run one at a time in source order, so a tool that touches the
//! filesystem always sees the effects of the tools before it. Every request
//! produces exactly one [`ToolResult`]; nothing here returns an error.

use std::sync::Arc;
use std::time::{Duration, Instant};
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{FailureKind, ToolCallRequest, ToolRegistry, ToolResult};
use tracing::{debug, info, warn};

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute every request in order.
    pub async fn execute_all(&self, requests: &[ToolCallRequest]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.execute(request.clone()).await);
        }
        results
    }

    /// Resolve, validate, and run a single request.
    pub async fn execute(&self, request: ToolCallRequest) -> ToolResult {
        let start = Instant::now();
        let result = self.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if result.success {
            info!(tool = %result.request.name, call_id = %result.request.id, duration_ms, "Tool succeeded");
        } else {
            warn!(
                tool = %result.request.name,
                call_id = %result.request.id,
                failure = ?result.failure,
                error = %result.output,
                duration_ms,
                "Tool failed"
            );
        }
        result
    }

    async fn run(&self, request: ToolCallRequest) -> ToolResult {
        let tool = match self.registry.resolve(&request.name) {
            Ok(tool) => tool,
            Err(e) => {
                let available = self.registry.names().join(", ");
                return ToolResult::failure(
                    request,
                    FailureKind::UnknownTool,
                    format!("{e}. Available tools: {available}"),
                );
            }
        };

        if let Err(problems) = tool.schema().validate(&request.arguments) {
            return ToolResult::failure(
                request,
                FailureKind::InvalidArguments,
                format!("Invalid arguments for '{}': {problems}", tool.name()),
            );
        }

        debug!(tool = %request.name, args = ?request.arguments, "Executing tool");

        // a panicking handler only takes down its own task
        let arguments = request.arguments.clone();
        let mut task = tokio::spawn(async move { tool.execute(&arguments).await });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(output))) => ToolResult::success(request, output),
            Ok(Ok(Err(ToolError::InvalidArguments(reason)))) => {
                ToolResult::failure(request, FailureKind::InvalidArguments, reason)
            }
            Ok(Ok(Err(e))) => ToolResult::failure(request, FailureKind::Execution, e.to_string()),
            Ok(Err(join_error)) => {
                let reason = if join_error.is_panic() {
                    format!("panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "task was cancelled".to_string()
                };
                let e = ToolError::ExecutionFailed {
                    tool_name: request.name.clone(),
                    reason,
                };
                ToolResult::failure(request, FailureKind::Execution, e.to_string())
            }
            Err(_) => {
                task.abort();
                let e = ToolError::Timeout {
                    tool_name: request.name.clone(),
                    timeout_secs: self.timeout.as_secs(),
                };
                ToolResult::failure(request, FailureKind::Timeout, e.to_string())
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
