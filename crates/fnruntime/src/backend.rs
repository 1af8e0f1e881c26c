use async_trait::async_trait;
use fncore::{
    ExecutionResult, FunctionDraft, FunctionId, FunctionPatch, FunctionRecord, MetricSample, Result,
};

/// Transport to the function-execution backend.
///
/// Implementations classify every failure into a [`fncore::ConsoleError`]
/// where it happens and have no side effects beyond the request itself.
#[async_trait]
pub trait FunctionBackend: Send + Sync {
    /// Short label used in logs (e.g. the base URL)
    fn name(&self) -> &str;

    async fn list_functions(&self) -> Result<Vec<FunctionRecord>>;

    async fn get_function(&self, id: FunctionId) -> Result<FunctionRecord>;

    async fn create_function(&self, draft: &FunctionDraft) -> Result<FunctionRecord>;

    async fn update_function(&self, id: FunctionId, patch: &FunctionPatch) -> Result<FunctionRecord>;

    async fn delete_function(&self, id: FunctionId) -> Result<()>;

    async fn execute_function(
        &self,
        id: FunctionId,
        input: &serde_json::Value,
    ) -> Result<ExecutionResult>;

    /// Full stored history for a function, in whatever order the backend keeps it
    async fn function_metrics(&self, id: FunctionId) -> Result<Vec<MetricSample>>;
}
