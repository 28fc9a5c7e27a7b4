//! On-disk notebook format.
//!
//! Reads and writes the notebook's native JSON document, mapped onto the
//! in-memory [`NotebookDocument`]/[`Cell`] types through a schema-checked
//! deserialization step. Structurally invalid input is rejected with a
//! descriptive reason before anything reaches the store.
//!
//! ## Vendor namespace
//!
//! Document and cell metadata carry an `nbstore` block alongside whatever
//! Jupyter metadata the file already had (which round-trips untouched):
//!
//! ```text
//! metadata/
//!   nbstore/
//!     uuid: Str                  ← document uuid (minted per open)
//!     path: Str                  ← absolute backing-file path
//!     name: Str                  ← filename without extension
//!     working_directory: Str
//! cells[i]/metadata/
//!   nbstore/
//!     uuid: Str                  ← cell uuid
//!     notebook: Str              ← owning document uuid
//!     execution_state: Str       ← code cells only
//! ```
//!
//! Cell `source` is a list of lines on disk and a single string in memory.
//! Execution counts and states are transient: every load resets them.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cell::{Cell, CellType, ExecutionState};
use crate::document::NotebookDocument;

/// Metadata key for the vendor block, at both document and cell level.
pub const VENDOR_KEY: &str = "nbstore";

/// Failures while reading a notebook document.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("notebook is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported nbformat version {0}")]
    UnsupportedVersion(i64),
}

/// The `metadata.nbstore` block of a notebook document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookVendorMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
}

/// The `metadata.nbstore` block of a single cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CellVendorMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<Uuid>,

    /// Owning document uuid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notebook: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution_state: Option<ExecutionState>,
}

/// Document-level metadata as surfaced by the `metadata` store operation:
/// the vendor block plus every other key the file carries (kernelspec,
/// language_info, extensions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookMetadata {
    #[serde(rename = "nbstore", default)]
    pub vendor: NotebookVendorMetadata,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of parsing notebook bytes: a live document (fresh uuid, reset
/// run state) plus the vendor block the file carried, which the store uses
/// for de-duplicating re-submitted documents.
#[derive(Debug)]
pub struct Loaded {
    pub document: NotebookDocument,
    pub vendor: NotebookVendorMetadata,
}

// ── Wire structs ─────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct RawNotebook {
    cells: Vec<RawCell>,
    #[serde(default)]
    metadata: Map<String, Value>,
    nbformat: i64,
    #[serde(default)]
    nbformat_minor: i64,
}

#[derive(Serialize, Deserialize)]
struct RawCell {
    cell_type: CellType,
    #[serde(
        default,
        deserialize_with = "deserialize_source",
        serialize_with = "serialize_source"
    )]
    source: String,
    #[serde(default)]
    metadata: Map<String, Value>,
    /// Doubly-optional so a code cell's `null` count survives while
    /// markdown/raw cells omit the key entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution_count: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outputs: Option<Vec<Value>>,
}

/// Deserialize cell source from either a plain string or the on-disk
/// list-of-lines form.
fn deserialize_source<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct SourceVisitor;

    impl<'de> de::Visitor<'de> for SourceVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<String, A::Error> {
            let mut source = String::new();
            while let Some(line) = seq.next_element::<String>()? {
                source.push_str(&line);
            }
            Ok(source)
        }
    }

    deserializer.deserialize_any(SourceVisitor)
}

/// Serialize cell source as a list of lines, each keeping its newline.
fn serialize_source<S>(source: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let lines: Vec<&str> = if source.is_empty() {
        Vec::new()
    } else {
        source.split_inclusive('\n').collect()
    };
    lines.serialize(serializer)
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Parse notebook bytes into a live document.
///
/// The returned document has a freshly minted uuid and idle run state.
/// Cell uuids found in the file are preserved when they are unique within
/// the document; missing or duplicate ids are minted fresh.
pub fn parse(data: &[u8]) -> Result<Loaded, ReadError> {
    let text = std::str::from_utf8(data)?;
    let mut raw: RawNotebook = serde_json::from_str(text)?;
    if raw.nbformat != 4 {
        return Err(ReadError::UnsupportedVersion(raw.nbformat));
    }

    let vendor = take_vendor::<NotebookVendorMetadata>(&mut raw.metadata);

    let mut seen = HashSet::new();
    let cells = raw
        .cells
        .into_iter()
        .map(|mut rc| {
            let cell_vendor = take_vendor::<CellVendorMetadata>(&mut rc.metadata);
            let uuid = cell_vendor
                .uuid
                .filter(|id| seen.insert(*id))
                .unwrap_or_else(Uuid::new_v4);
            seen.insert(uuid);
            Cell {
                uuid,
                cell_type: rc.cell_type,
                source: rc.source,
                execution_count: None,
                execution_state: ExecutionState::Idle,
                outputs: rc.outputs.unwrap_or_default(),
                metadata: rc.metadata,
            }
        })
        .collect();

    let document = NotebookDocument::from_parts(
        vendor.name.clone().unwrap_or_default(),
        vendor.working_directory.clone().unwrap_or_default(),
        raw.metadata,
        raw.nbformat,
        raw.nbformat_minor,
        cells,
    );

    Ok(Loaded { document, vendor })
}

/// Parse only the document-level metadata, without building a document.
pub fn parse_metadata(data: &[u8]) -> Result<NotebookMetadata, ReadError> {
    let text = std::str::from_utf8(data)?;
    let raw: RawNotebook = serde_json::from_str(text)?;
    if raw.nbformat != 4 {
        return Err(ReadError::UnsupportedVersion(raw.nbformat));
    }
    let mut metadata = raw.metadata;
    let vendor = take_vendor::<NotebookVendorMetadata>(&mut metadata);
    Ok(NotebookMetadata {
        vendor,
        extra: metadata,
    })
}

/// Live metadata for an open document, mirroring what `serialize` stamps
/// into the file.
pub fn document_metadata(doc: &NotebookDocument) -> NotebookMetadata {
    NotebookMetadata {
        vendor: document_vendor(doc),
        extra: doc.metadata.clone(),
    }
}

fn document_vendor(doc: &NotebookDocument) -> NotebookVendorMetadata {
    NotebookVendorMetadata {
        uuid: Some(doc.uuid),
        path: doc.path.clone(),
        name: Some(doc.name.clone()),
        working_directory: (!doc.working_directory.as_os_str().is_empty())
            .then(|| doc.working_directory.clone()),
    }
}

// ── Serialization ────────────────────────────────────────────────────

/// Serialize a document to its on-disk JSON, vendor blocks included.
pub fn serialize(doc: &NotebookDocument) -> Result<String, serde_json::Error> {
    let mut metadata = doc.metadata.clone();
    put_vendor(&mut metadata, &document_vendor(doc))?;

    let cells = doc
        .cells()
        .iter()
        .map(|cell| {
            let mut cell_metadata = cell.metadata.clone();
            put_vendor(
                &mut cell_metadata,
                &CellVendorMetadata {
                    uuid: Some(cell.uuid),
                    notebook: Some(doc.uuid),
                    execution_state: (cell.cell_type == CellType::Code)
                        .then_some(cell.execution_state),
                },
            )?;
            let is_code = cell.cell_type == CellType::Code;
            Ok(RawCell {
                cell_type: cell.cell_type,
                source: cell.source.clone(),
                metadata: cell_metadata,
                execution_count: is_code.then_some(cell.execution_count),
                outputs: is_code.then(|| cell.outputs.clone()),
            })
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let raw = RawNotebook {
        cells,
        metadata,
        nbformat: doc.nbformat,
        nbformat_minor: doc.nbformat_minor,
    };
    serde_json::to_string_pretty(&raw)
}

fn take_vendor<T: Default + serde::de::DeserializeOwned>(metadata: &mut Map<String, Value>) -> T {
    metadata
        .remove(VENDOR_KEY)
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn put_vendor<T: Serialize>(
    metadata: &mut Map<String, Value>,
    vendor: &T,
) -> Result<(), serde_json::Error> {
    metadata.insert(VENDOR_KEY.to_string(), serde_json::to_value(vendor)?);
    Ok(())
}
