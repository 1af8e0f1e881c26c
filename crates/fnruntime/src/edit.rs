use fncore::{ConsoleError, FunctionDraft, FunctionId, FunctionPatch, FunctionRecord, TransitionError};

/// Representation a record is shown in
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    Viewing,
    Editing {
        draft: FunctionDraft,
        /// Failure of the last save attempt, if any
        error: Option<ConsoleError>,
    },
    Saving {
        draft: FunctionDraft,
    },
}

impl EditState {
    fn name(&self) -> &'static str {
        match self {
            EditState::Viewing => "viewing",
            EditState::Editing { .. } => "editing",
            EditState::Saving { .. } => "saving",
        }
    }
}

/// Edit/view toggle for one function record.
///
/// The snapshot is the canonical record as last confirmed by the backend;
/// it only changes when a save succeeds.
#[derive(Debug, Clone)]
pub struct EditSession {
    snapshot: FunctionRecord,
    state: EditState,
}

impl EditSession {
    pub fn new(record: FunctionRecord) -> Self {
        Self { snapshot: record, state: EditState::Viewing }
    }

    pub fn function_id(&self) -> FunctionId {
        self.snapshot.id
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Canonical record, unaffected by in-progress edits
    pub fn record(&self) -> &FunctionRecord {
        &self.snapshot
    }

    pub fn is_viewing(&self) -> bool {
        matches!(self.state, EditState::Viewing)
    }

    /// Error attached by the last failed save
    pub fn error(&self) -> Option<&ConsoleError> {
        match &self.state {
            EditState::Editing { error, .. } => error.as_ref(),
            _ => None,
        }
    }

    /// Viewing → Editing with a draft copy of the record.
    pub fn begin_edit(&mut self) -> Result<(), TransitionError> {
        match self.state {
            EditState::Viewing => {
                self.state = EditState::Editing { draft: self.snapshot.to_draft(), error: None };
                Ok(())
            }
            _ => Err(TransitionError::new(self.state.name(), "start editing")),
        }
    }

    /// Mutable access to the draft while editing.
    pub fn draft_mut(&mut self) -> Option<&mut FunctionDraft> {
        match &mut self.state {
            EditState::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&FunctionDraft> {
        match &self.state {
            EditState::Editing { draft, .. } | EditState::Saving { draft } => Some(draft),
            EditState::Viewing => None,
        }
    }

    /// Editing → Viewing, dropping the draft.
    pub fn discard(&mut self) -> Result<(), TransitionError> {
        match self.state {
            EditState::Editing { .. } => {
                self.state = EditState::Viewing;
                Ok(())
            }
            _ => Err(TransitionError::new(self.state.name(), "discard")),
        }
    }

    /// Editing → Saving. Returns the patch to submit.
    pub fn begin_save(&mut self) -> Result<FunctionPatch, TransitionError> {
        let state = std::mem::replace(&mut self.state, EditState::Viewing);
        match state {
            EditState::Editing { draft, .. } => {
                let patch = FunctionPatch::between(&self.snapshot, &draft);
                self.state = EditState::Saving { draft };
                Ok(patch)
            }
            other => {
                let name = other.name();
                self.state = other;
                Err(TransitionError::new(name, "save"))
            }
        }
    }

    /// Saving → Viewing with the confirmed record, or back to Editing with
    /// the draft intact and the error attached.
    pub fn finish_save(
        &mut self,
        outcome: Result<FunctionRecord, ConsoleError>,
    ) -> Result<(), TransitionError> {
        let state = std::mem::replace(&mut self.state, EditState::Viewing);
        let draft = match state {
            EditState::Saving { draft } => draft,
            other => {
                let name = other.name();
                self.state = other;
                return Err(TransitionError::new(name, "finish saving"));
            }
        };

        match outcome {
            Ok(record) => {
                self.snapshot = record;
                self.state = EditState::Viewing;
            }
            Err(error) => {
                self.state = EditState::Editing { draft, error: Some(error) };
            }
        }
        Ok(())
    }
}
