use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FunctionId;

/// Identifies one call to `execute`; concurrent calls get distinct ids
pub type InvocationId = Uuid;

/// On-demand execution of a function against an opaque JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub function_id: FunctionId,
    pub input: serde_json::Value,
}

impl ExecutionRequest {
    /// Parse operator-supplied text. Fails before any request is made.
    pub fn parse(function_id: FunctionId, input_text: &str) -> crate::Result<Self> {
        let input = serde_json::from_str(input_text)?;
        Ok(Self { function_id, input })
    }
}

/// Resource usage reported for one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Seconds
    pub execution_time: f64,
    /// Megabytes
    pub memory_usage: f64,
    /// Percent
    pub cpu_usage: f64,
}

/// Successful response of the execute endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub result: serde_json::Value,
    pub metrics: ExecutionMetrics,
}

/// Lifecycle of a single invocation. A function with no invocation is idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ExecutionPhase {
    Submitting,
    Succeeded { result: ExecutionResult },
    Failed { error: String },
}

impl ExecutionPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ExecutionPhase::Submitting)
    }
}
