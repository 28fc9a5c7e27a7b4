//! Cell model: the atomic addressable unit of a notebook document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of notebook cell, matching the `cell_type` field of the on-disk
/// format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    #[default]
    Code,
    Markdown,
    Raw,
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellType::Code => write!(f, "code"),
            CellType::Markdown => write!(f, "markdown"),
            CellType::Raw => write!(f, "raw"),
        }
    }
}

/// Kernel run state of a code cell.
///
/// Transient: never survives a (re)load from disk. A freshly opened
/// document always reports `Idle` with no execution count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    #[default]
    Idle,
    Pending,
    Busy,
    Unknown,
}

/// A single notebook cell.
///
/// The `uuid` is assigned once when the cell enters memory and is never
/// reused within the owning document. `source` is held as one string; the
/// on-disk format splits it into lines (see `format`).
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub uuid: Uuid,
    pub cell_type: CellType,
    pub source: String,
    pub execution_count: Option<i64>,
    pub execution_state: ExecutionState,
    /// Kernel outputs, carried through structural edits untouched.
    pub outputs: Vec<Value>,
    /// Passthrough cell metadata (tags, collapsed state, extensions).
    /// The vendor namespace is stripped on load and re-stamped on save.
    pub metadata: Map<String, Value>,
}

impl Cell {
    /// Create a fresh cell with a newly minted identity and no run state.
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Self::with_uuid(Uuid::new_v4(), cell_type, source)
    }

    /// Create a cell with an explicit identity. Used when restoring a
    /// deleted cell through undo, where the original uuid must come back.
    pub fn with_uuid(uuid: Uuid, cell_type: CellType, source: impl Into<String>) -> Self {
        Self {
            uuid,
            cell_type,
            source: source.into(),
            execution_count: None,
            execution_state: ExecutionState::Idle,
            outputs: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Reset transient run state: outputs stay (they are document content
    /// until explicitly cleared), counts and state do not.
    pub fn reset_execution_state(&mut self) {
        self.execution_count = None;
        self.execution_state = ExecutionState::Idle;
    }

    /// Clear kernel results entirely: outputs, count, and state.
    pub fn clear(&mut self) {
        self.outputs.clear();
        self.reset_execution_state();
    }

    /// Length of the source in characters (the unit used by split offsets).
    pub fn source_chars(&self) -> usize {
        self.source.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cell_has_fresh_identity_and_idle_state() {
        let a = Cell::new(CellType::Code, "1+1");
        let b = Cell::new(CellType::Code, "1+1");
        assert_ne!(a.uuid, b.uuid);
        assert_eq!(a.execution_count, None);
        assert_eq!(a.execution_state, ExecutionState::Idle);
        assert!(a.outputs.is_empty());
    }

    #[test]
    fn test_with_uuid_preserves_identity() {
        let id = Uuid::new_v4();
        let cell = Cell::with_uuid(id, CellType::Markdown, "# hi");
        assert_eq!(cell.uuid, id);
        assert_eq!(cell.cell_type, CellType::Markdown);
        assert_eq!(cell.source, "# hi");
    }

    #[test]
    fn test_clear_removes_outputs_and_run_state() {
        let mut cell = Cell::new(CellType::Code, "print(1)");
        cell.execution_count = Some(3);
        cell.execution_state = ExecutionState::Busy;
        cell.outputs.push(serde_json::json!({"output_type": "stream"}));

        cell.clear();

        assert!(cell.outputs.is_empty());
        assert_eq!(cell.execution_count, None);
        assert_eq!(cell.execution_state, ExecutionState::Idle);
    }

    #[test]
    fn test_reset_execution_state_keeps_outputs() {
        let mut cell = Cell::new(CellType::Code, "x");
        cell.execution_count = Some(7);
        cell.outputs.push(serde_json::json!({"output_type": "stream"}));

        cell.reset_execution_state();

        assert_eq!(cell.execution_count, None);
        assert_eq!(cell.outputs.len(), 1);
    }

    #[test]
    fn test_source_chars_counts_characters_not_bytes() {
        let cell = Cell::new(CellType::Markdown, "héllo");
        assert_eq!(cell.source_chars(), 5);
        assert!(cell.source.len() > 5);
    }

    #[test]
    fn test_cell_type_display_matches_serde() {
        for (ty, s) in [
            (CellType::Code, "code"),
            (CellType::Markdown, "markdown"),
            (CellType::Raw, "raw"),
        ] {
            assert_eq!(ty.to_string(), s);
            assert_eq!(serde_json::to_value(ty).unwrap(), serde_json::json!(s));
        }
    }
}
