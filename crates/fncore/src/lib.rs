//! Core abstractions for the function console
//!
//! This crate provides the data model, the error taxonomy and the console
//! event bus that all other components depend on. It performs no I/O.

mod error;
pub mod events;
mod execution;
mod metrics;
mod record;

pub use error::{ConsoleError, ErrorKind, TransitionError};
pub use events::*;
pub use execution::{ExecutionMetrics, ExecutionPhase, ExecutionRequest, ExecutionResult, InvocationId};
pub use metrics::MetricSample;
pub use record::{FunctionDraft, FunctionId, FunctionPatch, FunctionRecord, Language};

/// Result type for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;
