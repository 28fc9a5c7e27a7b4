//! notebook-store - Open-notebook registry for the notebook editing
//! service.
//!
//! Holds notebooks in memory as live [`NotebookDocument`]s, addresses
//! cells by stable identity, applies structural edits through the
//! reversible command engine in `notebook-model`, and keeps disk in sync
//! via autosave. The surrounding transport layer (REST/WebSocket) and
//! kernel management live elsewhere and talk to this crate through
//! [`NotebookStore`]'s operation surface.
//!
//! The store enforces one open instance per resolved backing path:
//! opening an already-open path returns the existing document unchanged,
//! without re-reading the file or minting a new identity.

pub mod config;
pub mod error;
pub mod persist;
pub mod store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use store::{CellUpdate, NotebookStore};

pub use notebook_model::{Cell, CellType, Command, CommandError, ExecutionState, NotebookDocument};
