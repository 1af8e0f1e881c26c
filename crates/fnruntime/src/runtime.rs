use crate::{
    ConsoleState, ConsoleStore, DeletionFlow, EditSession, ExecutionOrchestrator, FunctionBackend,
    MetricsPoller, PollerHandle, RegistryClient,
};
use chrono::Utc;
use fncore::{
    ConsoleError, ConsoleEvent, ExecutionResult, FunctionDraft, FunctionId, FunctionRecord,
    MetricSample, Result,
};
use std::sync::Arc;
use std::time::Duration;

/// Operator console over one backend
pub struct Console {
    backend: Arc<dyn FunctionBackend>,
    registry: RegistryClient,
    orchestrator: ExecutionOrchestrator,
    store: Arc<ConsoleStore>,
    config: ConsoleConfig,
}

impl Console {
    /// Create a console with default settings
    pub fn new(backend: Arc<dyn FunctionBackend>) -> Self {
        Self::with_config(backend, ConsoleConfig::default())
    }

    /// Create a console with custom configuration
    pub fn with_config(backend: Arc<dyn FunctionBackend>, config: ConsoleConfig) -> Self {
        let store = Arc::new(ConsoleStore::new(config.event_buffer_size));
        let registry = RegistryClient::new(backend.clone());
        let orchestrator = ExecutionOrchestrator::new(backend.clone(), store.clone());

        Self {
            backend,
            registry,
            orchestrator,
            store,
            config,
        }
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    pub fn orchestrator(&self) -> &ExecutionOrchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<ConsoleStore> {
        &self.store
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Subscribe to applied console events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ConsoleEvent> {
        self.store.subscribe()
    }

    /// Load the function list, replacing the cache.
    ///
    /// Creates, updates and removals applied while the request is in flight
    /// are kept over the older list.
    pub async fn load(&self) -> Result<Vec<FunctionRecord>> {
        let epoch = self.store.read().await.epoch();
        let records = self.registry.list().await?;
        tracing::info!("Loaded {} functions", records.len());

        self.store
            .dispatch(ConsoleEvent::RecordsLoaded {
                records,
                epoch,
                timestamp: Utc::now(),
            })
            .await;

        Ok(self.store.read().await.records().cloned().collect())
    }

    /// Fetch one record. The cache is refreshed only if it still holds the id.
    pub async fn get(&self, id: FunctionId) -> Result<FunctionRecord> {
        let record = self.registry.get(id).await?;
        self.store
            .dispatch(ConsoleEvent::RecordUpdated { record: record.clone() })
            .await;
        Ok(record)
    }

    pub async fn create(&self, draft: &FunctionDraft) -> Result<FunctionRecord> {
        let record = self.registry.create(draft).await?;
        self.store
            .dispatch(ConsoleEvent::RecordCreated { record: record.clone() })
            .await;
        Ok(record)
    }

    /// Execute a function with operator-supplied JSON text.
    pub async fn execute(&self, id: FunctionId, input_text: &str) -> Result<ExecutionResult> {
        self.orchestrator.execute(id, input_text).await
    }

    /// Open a cached record in the viewing state.
    pub async fn open(&self, id: FunctionId) -> Result<EditSession> {
        let state = self.store.read().await;
        let record = state
            .record(id)
            .cloned()
            .ok_or_else(|| ConsoleError::NotFound(format!("Function {} is not loaded", id)))?;
        Ok(EditSession::new(record))
    }

    /// Commit the session's draft. On failure the session stays in editing
    /// with the error attached and the cache is left alone.
    pub async fn save(&self, session: &mut EditSession) -> Result<FunctionRecord> {
        let patch = session.begin_save()?;
        let id = session.function_id();

        let outcome = self.registry.update(id, &patch).await;
        match &outcome {
            Ok(record) => {
                self.store
                    .dispatch(ConsoleEvent::RecordUpdated { record: record.clone() })
                    .await;
            }
            Err(e) => tracing::error!(function_id = id, "Saving edits failed: {}", e),
        }

        session.finish_save(outcome.clone())?;
        outcome
    }

    /// Confirm and commit a pending deletion.
    ///
    /// The record leaves the cache only once the backend confirmed removal.
    pub async fn commit_deletion(&self, flow: &mut DeletionFlow) -> Result<FunctionId> {
        let id = flow.confirm()?;

        match self.registry.delete(id).await {
            Ok(()) => {
                self.store
                    .dispatch(ConsoleEvent::RecordRemoved { function_id: id })
                    .await;
                flow.complete(Ok(()))?;
                Ok(id)
            }
            Err(e) => {
                tracing::error!(function_id = id, "Deletion failed: {}", e);
                flow.complete(Err(e.clone()))?;
                Err(e)
            }
        }
    }

    /// Poller over this console's store, not yet started.
    pub fn poller(&self) -> MetricsPoller {
        MetricsPoller::new(self.backend.clone(), self.store.clone(), self.config.poll_interval)
    }

    /// Start polling metrics, loading the function list first if needed.
    pub async fn start_polling(&self) -> Result<PollerHandle> {
        if !self.store.read().await.is_loaded() {
            self.load().await?;
        }
        Ok(self.poller().start())
    }

    /// Fetch one function's history on demand, oldest first. Unlike a poll
    /// tick, the failure is returned to the caller.
    ///
    /// The cache is refreshed only if it holds the id; the fetched history is
    /// returned either way.
    pub async fn refresh_metrics(&self, id: FunctionId) -> Result<Vec<MetricSample>> {
        let mut samples = self.backend.function_metrics(id).await?;
        samples.sort_by_key(|s| s.timestamp);

        self.store
            .dispatch(ConsoleEvent::MetricsRefreshed {
                function_id: id,
                samples: samples.clone(),
                timestamp: Utc::now(),
            })
            .await;
        Ok(samples)
    }

    pub async fn snapshot(&self) -> ConsoleState {
        self.store.snapshot().await
    }

    pub async fn metrics(&self, id: FunctionId) -> Vec<MetricSample> {
        self.store.read().await.metrics(id).to_vec()
    }
}

/// Configuration for the console
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub poll_interval: Duration,
    pub event_buffer_size: usize,
}

impl ConsoleConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            event_buffer_size: 1000,
        }
    }
}
