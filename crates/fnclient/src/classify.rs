use fncore::ConsoleError;
use std::fmt;

/// Backend endpoint being called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
    Execute,
    Metrics,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list functions",
            Operation::Get => "get function",
            Operation::Create => "create function",
            Operation::Update => "update function",
            Operation::Delete => "delete function",
            Operation::Execute => "execute function",
            Operation::Metrics => "fetch metrics",
        };
        f.write_str(name)
    }
}

/// Map a non-success status to its error kind.
pub fn classify_status(operation: Operation, status: u16, detail: String) -> ConsoleError {
    match (operation, status) {
        (_, 404) => ConsoleError::NotFound(detail),
        (Operation::Create | Operation::Update, 400 | 409 | 422) => ConsoleError::Validation(detail),
        (Operation::Execute, _) => ConsoleError::Execution(detail),
        _ => ConsoleError::Backend { status, detail },
    }
}

/// Pull the `detail` field out of an error body.
///
/// String details are returned verbatim; structured ones (validation error
/// lists) as compact JSON. Bodies without a detail are returned as-is.
pub fn extract_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(mut map)) => match map.remove("detail") {
            Some(serde_json::Value::String(detail)) => detail,
            Some(other) => other.to_string(),
            None => body.trim().to_string(),
        },
        _ => body.trim().to_string(),
    }
}
