//! Persistence adapter: writes an open document back to its bound path.
//!
//! Disk is a cache of memory state, not the reverse. A failed write is
//! surfaced to the caller of the triggering operation, but the in-memory
//! document is never rolled back.

use std::io;

use log::debug;
use notebook_model::{format, NotebookDocument};

use crate::error::StoreError;

/// Serialize `document` and replace the contents of its bound path.
///
/// Documents without a bound path (no-autosave mode) are a no-op.
pub async fn write(document: &NotebookDocument) -> Result<(), StoreError> {
    let Some(path) = document.path.clone() else {
        return Ok(());
    };
    let json = format::serialize(document).map_err(|err| StoreError::Autosave {
        path: path.clone(),
        source: io::Error::new(io::ErrorKind::InvalidData, err),
    })?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| StoreError::Autosave {
            path: path.clone(),
            source,
        })?;
    debug!("[persist] wrote {:?}", path);
    Ok(())
}
