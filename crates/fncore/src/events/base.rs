use crate::{ConsoleError, ExecutionResult, FunctionId, FunctionRecord, InvocationId, MetricSample};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// State changes of the console.
///
/// Each variant is the completion of one asynchronous operation. The console
/// state consumes them through a pure transition and re-broadcasts the ones
/// it applied.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    /// Full list response. `epoch` is the cache revision read before the
    /// request was sent.
    RecordsLoaded {
        records: Vec<FunctionRecord>,
        epoch: u64,
        timestamp: DateTime<Utc>,
    },
    RecordCreated {
        record: FunctionRecord,
    },
    RecordUpdated {
        record: FunctionRecord,
    },
    RecordRemoved {
        function_id: FunctionId,
    },
    ExecutionSubmitted {
        function_id: FunctionId,
        invocation_id: InvocationId,
        timestamp: DateTime<Utc>,
    },
    ExecutionSucceeded {
        function_id: FunctionId,
        invocation_id: InvocationId,
        result: ExecutionResult,
        timestamp: DateTime<Utc>,
    },
    ExecutionFailed {
        function_id: FunctionId,
        invocation_id: InvocationId,
        error: ConsoleError,
        timestamp: DateTime<Utc>,
    },
    MetricsRefreshed {
        function_id: FunctionId,
        samples: Vec<MetricSample>,
        timestamp: DateTime<Utc>,
    },
    MetricsFetchFailed {
        function_id: FunctionId,
        error: ConsoleError,
        timestamp: DateTime<Utc>,
    },
}

impl ConsoleEvent {
    /// Function the event targets, if it targets a single one.
    pub fn function_id(&self) -> Option<FunctionId> {
        match self {
            ConsoleEvent::RecordsLoaded { .. } => None,
            ConsoleEvent::RecordCreated { record } | ConsoleEvent::RecordUpdated { record } => {
                Some(record.id)
            }
            ConsoleEvent::RecordRemoved { function_id }
            | ConsoleEvent::ExecutionSubmitted { function_id, .. }
            | ConsoleEvent::ExecutionSucceeded { function_id, .. }
            | ConsoleEvent::ExecutionFailed { function_id, .. }
            | ConsoleEvent::MetricsRefreshed { function_id, .. }
            | ConsoleEvent::MetricsFetchFailed { function_id, .. } => Some(*function_id),
        }
    }
}

/// Console-wide event bus
pub struct EventBus {
    sender: broadcast::Sender<ConsoleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ConsoleEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for console event");
        }
    }
}
