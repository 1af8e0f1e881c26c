use chrono::{DateTime, Utc};
use fncore::{
    ConsoleEvent, EventBus, ExecutionPhase, FunctionId, FunctionRecord, InvocationId, MetricSample,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;

/// Phase of the latest invocation of a function
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStatus {
    pub invocation_id: InvocationId,
    pub phase: ExecutionPhase,
    pub updated_at: DateTime<Utc>,
}

/// Everything the console displays, rebuilt only through [`ConsoleState::apply`].
#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    records: BTreeMap<FunctionId, FunctionRecord>,
    metrics: HashMap<FunctionId, Vec<MetricSample>>,
    executions: HashMap<FunctionId, ExecutionStatus>,
    loaded_at: Option<DateTime<Utc>>,
    epoch: u64,
    // epoch of the latest local create/update/remove per function
    touched: HashMap<FunctionId, u64>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one completed operation. Returns false when the event was
    /// discarded, which leaves the state untouched.
    ///
    /// Events targeting a function that is no longer cached are discarded,
    /// except `RecordCreated` which is the only way to add one.
    pub fn apply(&mut self, event: &ConsoleEvent) -> bool {
        match event {
            ConsoleEvent::RecordsLoaded { records, epoch, timestamp } => {
                let mut fresh: BTreeMap<FunctionId, FunctionRecord> =
                    records.iter().map(|r| (r.id, r.clone())).collect();

                // Local changes made after the list was requested win over it.
                for (&id, &touched_at) in &self.touched {
                    if touched_at <= *epoch {
                        continue;
                    }
                    match self.records.get(&id) {
                        Some(cached) => {
                            fresh.insert(id, cached.clone());
                        }
                        None => {
                            fresh.remove(&id);
                        }
                    }
                }

                self.records = fresh;
                let known = &self.records;
                self.metrics.retain(|id, _| known.contains_key(id));
                self.executions.retain(|id, _| known.contains_key(id));
                self.loaded_at = Some(*timestamp);
                true
            }
            ConsoleEvent::RecordCreated { record } => {
                self.records.insert(record.id, record.clone());
                self.touch(record.id);
                true
            }
            ConsoleEvent::RecordUpdated { record } => match self.records.get_mut(&record.id) {
                Some(cached) => {
                    *cached = record.clone();
                    self.touch(record.id);
                    true
                }
                None => false,
            },
            ConsoleEvent::RecordRemoved { function_id } => {
                self.metrics.remove(function_id);
                self.executions.remove(function_id);
                if self.records.remove(function_id).is_none() {
                    return false;
                }
                self.touch(*function_id);
                true
            }
            ConsoleEvent::ExecutionSubmitted { function_id, invocation_id, timestamp } => {
                if !self.records.contains_key(function_id) {
                    return false;
                }
                self.executions.insert(
                    *function_id,
                    ExecutionStatus {
                        invocation_id: *invocation_id,
                        phase: ExecutionPhase::Submitting,
                        updated_at: *timestamp,
                    },
                );
                true
            }
            ConsoleEvent::ExecutionSucceeded { function_id, invocation_id, result, timestamp } => {
                if !self.records.contains_key(function_id) {
                    return false;
                }
                let sample = MetricSample::from_metrics(*timestamp, &result.metrics);
                insert_ordered(self.metrics.entry(*function_id).or_default(), sample);
                self.settle(
                    *function_id,
                    *invocation_id,
                    ExecutionPhase::Succeeded { result: result.clone() },
                    *timestamp,
                );
                true
            }
            ConsoleEvent::ExecutionFailed { function_id, invocation_id, error, timestamp } => {
                if !self.records.contains_key(function_id) {
                    return false;
                }
                self.settle(
                    *function_id,
                    *invocation_id,
                    ExecutionPhase::Failed { error: error.to_string() },
                    *timestamp,
                );
                true
            }
            ConsoleEvent::MetricsRefreshed { function_id, samples, .. } => {
                if !self.records.contains_key(function_id) {
                    return false;
                }
                // Each fetch is the authoritative full history.
                let mut history = samples.clone();
                history.sort_by_key(|s| s.timestamp);
                self.metrics.insert(*function_id, history);
                true
            }
            ConsoleEvent::MetricsFetchFailed { function_id, .. } => {
                self.records.contains_key(function_id)
            }
        }
    }

    fn touch(&mut self, id: FunctionId) {
        self.epoch += 1;
        self.touched.insert(id, self.epoch);
    }

    /// Record a completion unless a newer invocation has started since.
    fn settle(
        &mut self,
        function_id: FunctionId,
        invocation_id: InvocationId,
        phase: ExecutionPhase,
        timestamp: DateTime<Utc>,
    ) {
        let is_latest = self
            .executions
            .get(&function_id)
            .map_or(true, |status| status.invocation_id == invocation_id);

        if is_latest {
            self.executions.insert(
                function_id,
                ExecutionStatus { invocation_id, phase, updated_at: timestamp },
            );
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Revision of the record cache, bumped by every local create, update
    /// and removal.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn records(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.records.values()
    }

    pub fn record(&self, id: FunctionId) -> Option<&FunctionRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn function_ids(&self) -> Vec<FunctionId> {
        self.records.keys().copied().collect()
    }

    /// Timestamp-ordered history; empty if nothing was fetched yet.
    pub fn metrics(&self, id: FunctionId) -> &[MetricSample] {
        self.metrics.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Latest invocation status. `None` means idle.
    pub fn execution(&self, id: FunctionId) -> Option<&ExecutionStatus> {
        self.executions.get(&id)
    }
}

fn insert_ordered(history: &mut Vec<MetricSample>, sample: MetricSample) {
    let at = history.partition_point(|s| s.timestamp <= sample.timestamp);
    history.insert(at, sample);
}

/// Shared owner of the console state and its event bus
pub struct ConsoleStore {
    state: RwLock<ConsoleState>,
    events: EventBus,
}

impl ConsoleStore {
    pub fn new(event_buffer_size: usize) -> Self {
        Self {
            state: RwLock::new(ConsoleState::new()),
            events: EventBus::new(event_buffer_size),
        }
    }

    /// Apply an event and broadcast it if it changed anything.
    pub async fn dispatch(&self, event: ConsoleEvent) -> bool {
        let mut state = self.state.write().await;
        self.apply_locked(&mut state, event)
    }

    /// Like [`dispatch`](Self::dispatch), but drops the event if `token` was
    /// cancelled. The check happens under the write lock.
    pub async fn dispatch_unless_cancelled(
        &self,
        event: ConsoleEvent,
        token: &CancellationToken,
    ) -> bool {
        let mut state = self.state.write().await;
        if token.is_cancelled() {
            tracing::debug!(function_id = ?event.function_id(), "Dropping event after cancellation");
            return false;
        }
        self.apply_locked(&mut state, event)
    }

    fn apply_locked(&self, state: &mut ConsoleState, event: ConsoleEvent) -> bool {
        if !state.apply(&event) {
            tracing::debug!(
                function_id = ?event.function_id(),
                "Discarding result for a function no longer in the cache"
            );
            return false;
        }
        self.events.emit(event);
        true
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, ConsoleState> {
        self.state.read().await
    }

    pub async fn snapshot(&self) -> ConsoleState {
        self.state.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }
}
