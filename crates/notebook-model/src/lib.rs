//! notebook-model - In-memory notebook documents with reversible edits.
//!
//! This crate holds the pure data model for the notebook editing service:
//! cells, documents, the command engine that expresses every structural
//! edit as an exactly-invertible [`Command`], the per-document undo/redo
//! [`History`], and the on-disk JSON format layer.
//!
//! No I/O happens here; the `notebook-store` crate owns files, paths, and
//! the open-document registry.
//!
//! [`Command`]: command::Command
//! [`History`]: history::History

pub mod cell;
pub mod command;
pub mod document;
pub mod format;
pub mod history;

pub use cell::{Cell, CellType, ExecutionState};
pub use command::{Command, CommandError};
pub use document::NotebookDocument;
pub use history::History;
