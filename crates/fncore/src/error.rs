use thiserror::Error;

/// Every failure a console operation can produce.
///
/// Variants are decided where the failure happens (HTTP status, transport
/// error, local parse) so callers can branch on [`ConsoleError::kind`]
/// instead of reading messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    #[error("Invalid JSON input: {0}")]
    InputParse(String),

    #[error("Backend unreachable: {0}")]
    Connectivity(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Backend error (HTTP {status}): {detail}")]
    Backend { status: u16, detail: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Discriminant of [`ConsoleError`] for rendering guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputParse,
    Connectivity,
    Validation,
    NotFound,
    Execution,
    Backend,
    Transition,
}

impl ConsoleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::InputParse(_) => ErrorKind::InputParse,
            ConsoleError::Connectivity(_) => ErrorKind::Connectivity,
            ConsoleError::Validation(_) => ErrorKind::Validation,
            ConsoleError::NotFound(_) => ErrorKind::NotFound,
            ConsoleError::Execution(_) => ErrorKind::Execution,
            ConsoleError::Backend { .. } => ErrorKind::Backend,
            ConsoleError::Transition(_) => ErrorKind::Transition,
        }
    }

    /// Message as reported by the backend, without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            ConsoleError::InputParse(d)
            | ConsoleError::Connectivity(d)
            | ConsoleError::Validation(d)
            | ConsoleError::NotFound(d)
            | ConsoleError::Execution(d) => d.clone(),
            ConsoleError::Backend { detail, .. } => detail.clone(),
            ConsoleError::Transition(e) => e.to_string(),
        }
    }

    /// True when the request never reached or never returned from the backend.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ConsoleError::Connectivity(_))
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::InputParse(e.to_string())
    }
}

/// A state machine was asked to do something its current state does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot {action} while {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub action: &'static str,
}

impl TransitionError {
    pub fn new(state: &'static str, action: &'static str) -> Self {
        Self { state, action }
    }
}
