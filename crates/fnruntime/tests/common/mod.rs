// crates/fnruntime/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use fncore::{
    ConsoleError, ExecutionMetrics, ExecutionResult, FunctionDraft, FunctionId, FunctionPatch,
    FunctionRecord, Language, MetricSample, Result,
};
use fnruntime::FunctionBackend;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub const SUM_CODE: &str = "def handler(event):\n    return {'sum': event['num1'] + event['num2']}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    List,
    Get(FunctionId),
    Create,
    Update(FunctionId),
    Delete(FunctionId),
    Execute(FunctionId),
    Metrics(FunctionId),
}

#[derive(Default)]
struct Inner {
    next_id: FunctionId,
    records: BTreeMap<FunctionId, FunctionRecord>,
    metrics: HashMap<FunctionId, Vec<MetricSample>>,
    failing_metrics: HashSet<FunctionId>,
    fail_update: Option<ConsoleError>,
    fail_delete: Option<ConsoleError>,
    offline: bool,
}

/// In-memory backend that behaves like the real service and records every call
pub struct FakeBackend {
    inner: Mutex<Inner>,
    calls: Mutex<Vec<Call>>,
    metrics_gate: Option<Arc<Semaphore>>,
    list_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { next_id: 1, ..Inner::default() }),
            calls: Mutex::new(Vec::new()),
            metrics_gate: None,
            list_gate: Mutex::new(None),
        }
    }

    /// Metrics requests block until permits are added to the returned semaphore
    pub fn with_metrics_gate(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.metrics_gate = Some(gate.clone());
        (self, gate)
    }

    /// Hold back every later list response until a permit is added.
    pub fn gate_list(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn list_calls(&self) -> usize {
        self.count(|c| *c == Call::List)
    }

    pub fn seed(&self, draft: FunctionDraft) -> FunctionRecord {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        let record = to_record(id, draft);
        inner.records.insert(id, record.clone());
        record
    }

    pub fn seed_sum(&self) -> FunctionRecord {
        self.seed(draft("adder", "/add"))
    }

    pub fn push_sample(&self, id: FunctionId, execution_time: f64) {
        let mut inner = self.inner.lock().unwrap();
        let history = inner.metrics.entry(id).or_default();
        // strictly increasing, so ordering assertions never hit ties
        let mut timestamp = Utc::now();
        if let Some(last) = history.last() {
            if timestamp <= last.timestamp {
                timestamp = last.timestamp + chrono::Duration::milliseconds(1);
            }
        }
        history.push(MetricSample {
            timestamp,
            execution_time,
            memory_usage: 12.0,
            cpu_usage: 1.5,
            status: Some("success".to_string()),
            error_message: None,
        });
    }

    pub fn fail_metrics_for(&self, id: FunctionId) {
        self.inner.lock().unwrap().failing_metrics.insert(id);
    }

    pub fn fail_next_update(&self, error: ConsoleError) {
        self.inner.lock().unwrap().fail_update = Some(error);
    }

    pub fn fail_next_delete(&self, error: ConsoleError) {
        self.inner.lock().unwrap().fail_delete = Some(error);
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// Remove a record behind the console's back
    pub fn remove(&self, id: FunctionId) {
        self.inner.lock().unwrap().records.remove(&id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn metrics_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Metrics(_)))
    }

    pub fn execute_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Execute(_)))
    }

    pub fn update_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Update(_)))
    }

    fn record_call(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.inner.lock().unwrap().offline {
            return Err(ConsoleError::Connectivity("connection refused".to_string()));
        }
        Ok(())
    }
}

pub fn draft(name: &str, route: &str) -> FunctionDraft {
    FunctionDraft::new(name, route, Language::Python, SUM_CODE)
        .with_timeout(30)
        .with_env("MODE", "test")
}

fn to_record(id: FunctionId, draft: FunctionDraft) -> FunctionRecord {
    let now = Utc::now();
    FunctionRecord {
        id,
        name: draft.name,
        route: draft.route,
        language: draft.language,
        code: draft.code,
        timeout: draft.timeout,
        environment_variables: draft.environment_variables,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

fn not_found() -> ConsoleError {
    ConsoleError::NotFound("Function not found".to_string())
}

#[async_trait]
impl FunctionBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_functions(&self) -> Result<Vec<FunctionRecord>> {
        self.record_call(Call::List)?;
        let records: Vec<FunctionRecord> = self.inner.lock().unwrap().records.values().cloned().collect();

        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.map_err(|e| ConsoleError::Connectivity(e.to_string()))?;
            permit.forget();
        }
        Ok(records)
    }

    async fn get_function(&self, id: FunctionId) -> Result<FunctionRecord> {
        self.record_call(Call::Get(id))?;
        self.inner.lock().unwrap().records.get(&id).cloned().ok_or_else(not_found)
    }

    async fn create_function(&self, draft: &FunctionDraft) -> Result<FunctionRecord> {
        self.record_call(Call::Create)?;
        if self.inner.lock().unwrap().records.values().any(|r| r.route == draft.route) {
            return Err(ConsoleError::Validation(format!("Route {} already exists", draft.route)));
        }
        Ok(self.seed(draft.clone()))
    }

    async fn update_function(&self, id: FunctionId, patch: &FunctionPatch) -> Result<FunctionRecord> {
        self.record_call(Call::Update(id))?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_update.take() {
            return Err(error);
        }
        let record = inner.records.get_mut(&id).ok_or_else(not_found)?;
        *record = record.patched(patch);
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn delete_function(&self, id: FunctionId) -> Result<()> {
        self.record_call(Call::Delete(id))?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_delete.take() {
            return Err(error);
        }
        inner.metrics.remove(&id);
        inner.records.remove(&id).map(|_| ()).ok_or_else(not_found)
    }

    async fn execute_function(
        &self,
        id: FunctionId,
        input: &serde_json::Value,
    ) -> Result<ExecutionResult> {
        self.record_call(Call::Execute(id))?;
        if !self.inner.lock().unwrap().records.contains_key(&id) {
            return Err(not_found());
        }

        let (Some(a), Some(b)) = (input["num1"].as_f64(), input["num2"].as_f64()) else {
            return Err(ConsoleError::Execution("KeyError: 'num1'".to_string()));
        };
        let metrics = ExecutionMetrics { execution_time: 0.004, memory_usage: 12.5, cpu_usage: 0.8 };
        self.push_sample(id, metrics.execution_time);

        let sum = if a.fract() == 0.0 && b.fract() == 0.0 {
            serde_json::json!((a + b) as i64)
        } else {
            serde_json::json!(a + b)
        };
        Ok(ExecutionResult {
            result: serde_json::json!({ "sum": sum, "status": "success" }),
            metrics,
        })
    }

    async fn function_metrics(&self, id: FunctionId) -> Result<Vec<MetricSample>> {
        self.record_call(Call::Metrics(id))?;

        // The response is read when the request arrives; a gate only delays delivery.
        let response = {
            let inner = self.inner.lock().unwrap();
            if inner.failing_metrics.contains(&id) {
                Err(ConsoleError::Backend { status: 500, detail: "database is locked".to_string() })
            } else if !inner.records.contains_key(&id) {
                Err(not_found())
            } else {
                // newest first, like the real service
                let mut samples = inner.metrics.get(&id).cloned().unwrap_or_default();
                samples.reverse();
                Ok(samples)
            }
        };

        if let Some(gate) = &self.metrics_gate {
            let permit = gate.acquire().await.map_err(|e| ConsoleError::Connectivity(e.to_string()))?;
            permit.forget();
        }
        response
    }
}

/// Let spawned tasks run until `done` holds, without advancing time
pub async fn settle_until(done: impl Fn() -> bool) {
    for _ in 0..1000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}
