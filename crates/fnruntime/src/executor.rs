use crate::{ConsoleStore, FunctionBackend};
use chrono::Utc;
use fncore::{ConsoleEvent, ExecutionRequest, ExecutionResult, FunctionId, InvocationId, Result};
use std::sync::Arc;
use std::time::Instant;

/// Submits on-demand executions and records their outcome.
///
/// No concurrency limit is imposed: every call is an independent invocation
/// with its own [`InvocationId`].
#[derive(Clone)]
pub struct ExecutionOrchestrator {
    backend: Arc<dyn FunctionBackend>,
    store: Arc<ConsoleStore>,
}

impl ExecutionOrchestrator {
    pub fn new(backend: Arc<dyn FunctionBackend>, store: Arc<ConsoleStore>) -> Self {
        Self { backend, store }
    }

    /// Execute function `id` with operator-supplied JSON text.
    ///
    /// Malformed input fails with `InputParse` before any request is made.
    /// On success a metric sample stamped with the completion time is
    /// appended to the function's history.
    pub async fn execute(&self, id: FunctionId, input_text: &str) -> Result<ExecutionResult> {
        let request = ExecutionRequest::parse(id, input_text)?;
        self.submit(request).await
    }

    /// Execute an already-parsed request.
    pub async fn submit(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let function_id = request.function_id;
        let invocation_id = InvocationId::new_v4();
        let start_time = Instant::now();

        self.store
            .dispatch(ConsoleEvent::ExecutionSubmitted {
                function_id,
                invocation_id,
                timestamp: Utc::now(),
            })
            .await;

        tracing::info!(function_id, %invocation_id, "Submitting execution");

        let outcome = self.backend.execute_function(function_id, &request.input).await;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) => {
                tracing::info!(
                    function_id,
                    %invocation_id,
                    duration_ms,
                    "Execution completed in {:.3}s, {:.1}MB",
                    result.metrics.execution_time,
                    result.metrics.memory_usage
                );

                self.store
                    .dispatch(ConsoleEvent::ExecutionSucceeded {
                        function_id,
                        invocation_id,
                        result: result.clone(),
                        timestamp: Utc::now(),
                    })
                    .await;
            }
            Err(e) => {
                tracing::error!(function_id, %invocation_id, duration_ms, "Execution failed: {}", e);

                self.store
                    .dispatch(ConsoleEvent::ExecutionFailed {
                        function_id,
                        invocation_id,
                        error: e.clone(),
                        timestamp: Utc::now(),
                    })
                    .await;
            }
        }

        outcome
    }
}
