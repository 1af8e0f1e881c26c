use crate::FunctionBackend;
use fncore::{
    ConsoleError, FunctionDraft, FunctionId, FunctionPatch, FunctionRecord, Result,
};
use std::sync::Arc;

/// CRUD gateway to the backend's function definitions.
///
/// Holds no cache of its own; the console store decides what to keep.
#[derive(Clone)]
pub struct RegistryClient {
    backend: Arc<dyn FunctionBackend>,
}

impl RegistryClient {
    pub fn new(backend: Arc<dyn FunctionBackend>) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> Result<Vec<FunctionRecord>> {
        let records = self.backend.list_functions().await?;
        tracing::debug!("Listed {} functions from {}", records.len(), self.backend.name());
        Ok(records)
    }

    pub async fn get(&self, id: FunctionId) -> Result<FunctionRecord> {
        self.backend.get_function(id).await
    }

    /// Create a function. Drafts missing a name or route never leave the process.
    pub async fn create(&self, draft: &FunctionDraft) -> Result<FunctionRecord> {
        draft.validate().map_err(ConsoleError::Validation)?;

        let record = self.backend.create_function(draft).await?;
        tracing::info!(function_id = record.id, "Created function {} at {}", record.name, record.route);
        Ok(record)
    }

    pub async fn update(&self, id: FunctionId, patch: &FunctionPatch) -> Result<FunctionRecord> {
        patch.validate().map_err(ConsoleError::Validation)?;

        let record = self.backend.update_function(id, patch).await?;
        tracing::info!(function_id = id, "Updated function {}", record.name);
        Ok(record)
    }

    pub async fn delete(&self, id: FunctionId) -> Result<()> {
        self.backend.delete_function(id).await?;
        tracing::info!(function_id = id, "Deleted function");
        Ok(())
    }
}
