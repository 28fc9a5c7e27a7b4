//! In-memory notebook document.
//!
//! A `NotebookDocument` is the edit-live representation of a notebook,
//! distinct from its on-disk bytes. It owns the ordered cell sequence and
//! the undo/redo history; every structural edit goes through [`commit`],
//! which is the only path that mutates cells.
//!
//! [`commit`]: NotebookDocument::commit

use std::path::PathBuf;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cell::{Cell, CellType};
use crate::command::{Command, CommandError};
use crate::history::History;

/// Default nbformat version written for documents created in memory.
pub const NBFORMAT: i64 = 4;
pub const NBFORMAT_MINOR: i64 = 5;

/// An open notebook: identity, path binding, cells, and edit history.
///
/// The `uuid` is minted fresh every time a notebook enters memory; it is
/// not persisted identity. `path` is empty for documents that live only in
/// memory (no-autosave mode).
#[derive(Debug, Clone)]
pub struct NotebookDocument {
    pub uuid: Uuid,
    pub path: Option<PathBuf>,
    pub working_directory: PathBuf,
    /// Filename without extension.
    pub name: String,
    /// Passthrough notebook-level metadata (kernelspec, language_info,
    /// extensions). The vendor namespace is handled by `format`.
    pub metadata: Map<String, Value>,
    pub nbformat: i64,
    pub nbformat_minor: i64,
    cells: Vec<Cell>,
    history: History,
}

impl NotebookDocument {
    /// Create a new, empty in-memory document with a fresh identity.
    pub fn new(name: impl Into<String>, working_directory: PathBuf) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            path: None,
            working_directory,
            name: name.into(),
            metadata: Map::new(),
            nbformat: NBFORMAT,
            nbformat_minor: NBFORMAT_MINOR,
            cells: Vec::new(),
            history: History::new(),
        }
    }

    /// Assemble a document from parsed parts (see `format::parse`).
    pub fn from_parts(
        name: impl Into<String>,
        working_directory: PathBuf,
        metadata: Map<String, Value>,
        nbformat: i64,
        nbformat_minor: i64,
        cells: Vec<Cell>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            path: None,
            working_directory,
            name: name.into(),
            metadata,
            nbformat,
            nbformat_minor,
            cells,
            history: History::new(),
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn find_cell(&self, cell_uuid: Uuid) -> Result<&Cell, CommandError> {
        self.cells
            .iter()
            .find(|c| c.uuid == cell_uuid)
            .ok_or(CommandError::CellNotFound(cell_uuid))
    }

    /// Apply a forward command, recording its inverse for undo. Clears
    /// any pending redo entries.
    pub fn commit(&mut self, command: Command) -> Result<(), CommandError> {
        let inverse = command.apply(&mut self.cells)?;
        self.history.record(inverse);
        Ok(())
    }

    /// Commit a `Create` and return the new cell's uuid.
    pub fn insert_cell(
        &mut self,
        cell_type: CellType,
        source: impl Into<String>,
        before: Option<Uuid>,
    ) -> Result<Uuid, CommandError> {
        let id = Uuid::new_v4();
        self.commit(Command::Create {
            cell_type,
            source: source.into(),
            before,
            id: Some(id),
        })?;
        Ok(id)
    }

    /// Reverse the most recent committed command.
    pub fn undo(&mut self) -> Result<(), CommandError> {
        let command = self
            .history
            .pop_undo()
            .ok_or(CommandError::NothingToUndo)?;
        match command.apply(&mut self.cells) {
            Ok(inverse) => {
                self.history.push_redo(inverse);
                Ok(())
            }
            Err(err) => {
                // Leave the history as it was; the document is untouched.
                self.history.push_undo(command);
                Err(err)
            }
        }
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self) -> Result<(), CommandError> {
        let command = self
            .history
            .pop_redo()
            .ok_or(CommandError::NothingToRedo)?;
        match command.apply(&mut self.cells) {
            Ok(inverse) => {
                self.history.push_undo(inverse);
                Ok(())
            }
            Err(err) => {
                self.history.push_redo(command);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Reset one cell's kernel results. Not recorded in history.
    pub fn clear_cell(&mut self, cell_uuid: Uuid) -> Result<(), CommandError> {
        let cell = self
            .cells
            .iter_mut()
            .find(|c| c.uuid == cell_uuid)
            .ok_or(CommandError::CellNotFound(cell_uuid))?;
        cell.clear();
        Ok(())
    }

    /// Reset every cell's kernel results. Not recorded in history.
    pub fn clear_all_cells(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Reset transient run state on every cell (done on every load).
    pub fn reset_execution_state(&mut self) {
        for cell in &mut self.cells {
            cell.reset_execution_state();
        }
    }
}
