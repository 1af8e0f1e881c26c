use fncore::{ConsoleError, FunctionId, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionState {
    Idle,
    PendingConfirmation { function_id: FunctionId },
    Committing { function_id: FunctionId },
    Removed { function_id: FunctionId },
}

impl DeletionState {
    fn name(&self) -> &'static str {
        match self {
            DeletionState::Idle => "idle",
            DeletionState::PendingConfirmation { .. } => "awaiting confirmation",
            DeletionState::Committing { .. } => "deleting",
            DeletionState::Removed { .. } => "removed",
        }
    }
}

/// Two-phase delete: select a target, then confirm before anything is sent.
#[derive(Debug, Clone)]
pub struct DeletionFlow {
    state: DeletionState,
    last_error: Option<ConsoleError>,
}

impl DeletionFlow {
    pub fn new() -> Self {
        Self { state: DeletionState::Idle, last_error: None }
    }

    pub fn state(&self) -> DeletionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&ConsoleError> {
        self.last_error.as_ref()
    }

    /// Function the caller should navigate away from, once removed.
    pub fn removed(&self) -> Option<FunctionId> {
        match self.state {
            DeletionState::Removed { function_id } => Some(function_id),
            _ => None,
        }
    }

    /// Idle (or a finished flow) → PendingConfirmation.
    pub fn request(&mut self, function_id: FunctionId) -> Result<(), TransitionError> {
        match self.state {
            DeletionState::Idle | DeletionState::Removed { .. } => {
                self.state = DeletionState::PendingConfirmation { function_id };
                self.last_error = None;
                Ok(())
            }
            _ => Err(TransitionError::new(self.state.name(), "request deletion")),
        }
    }

    /// PendingConfirmation → Idle, without any request.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        match self.state {
            DeletionState::PendingConfirmation { function_id } => {
                tracing::debug!(function_id, "Deletion cancelled");
                self.state = DeletionState::Idle;
                Ok(())
            }
            _ => Err(TransitionError::new(self.state.name(), "cancel deletion")),
        }
    }

    /// PendingConfirmation → Committing. Returns the id to delete.
    pub fn confirm(&mut self) -> Result<FunctionId, TransitionError> {
        match self.state {
            DeletionState::PendingConfirmation { function_id } => {
                self.state = DeletionState::Committing { function_id };
                Ok(function_id)
            }
            _ => Err(TransitionError::new(self.state.name(), "confirm deletion")),
        }
    }

    /// Committing → Removed on backend confirmation, Idle with the error otherwise.
    pub fn complete(&mut self, outcome: Result<(), ConsoleError>) -> Result<(), TransitionError> {
        let DeletionState::Committing { function_id } = self.state else {
            return Err(TransitionError::new(self.state.name(), "complete deletion"));
        };

        match outcome {
            Ok(()) => {
                self.state = DeletionState::Removed { function_id };
                self.last_error = None;
            }
            Err(e) => {
                self.state = DeletionState::Idle;
                self.last_error = Some(e);
            }
        }
        Ok(())
    }
}

impl Default for DeletionFlow {
    fn default() -> Self {
        Self::new()
    }
}
