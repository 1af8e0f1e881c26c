//! Console runtime
//!
//! This crate wires the backend transport to the console state: the
//! registry client, the execution orchestrator, the metrics poller and the
//! edit and deletion state machines, composed behind [`Console`].

mod backend;
mod deletion;
mod edit;
mod executor;
mod poller;
mod registry;
mod runtime;
mod state;

pub use backend::FunctionBackend;
pub use deletion::{DeletionFlow, DeletionState};
pub use edit::{EditSession, EditState};
pub use executor::ExecutionOrchestrator;
pub use poller::{MetricsPoller, PollerHandle, TickReport};
pub use registry::RegistryClient;
pub use runtime::{Console, ConsoleConfig};
pub use state::{ConsoleState, ConsoleStore, ExecutionStatus};
