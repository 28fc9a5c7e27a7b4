//! Registry of open notebook documents.
//!
//! Owns the `uuid → document` mapping plus a `resolved path → uuid` index
//! that enforces one open instance per backing file. All mutating cell
//! operations run through the document's command engine and trigger an
//! autosave when the document is bound to a path.
//!
//! ## Concurrency
//!
//! The store is built for a single-threaded cooperative scheduler: every
//! method takes `&mut self`, suspension points only occur at file I/O, and
//! cell/history mutation is synchronous between awaits. Callers that share
//! a store across tasks wrap it in an async mutex; requests against the
//! same document are then serialized end to end, and the path index check
//! plus registration execute as one atomic step.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use notebook_model::format::{self, NotebookMetadata};
use notebook_model::{Cell, CellType, Command, NotebookDocument};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::persist;

/// A registered document plus its autosave policy.
#[derive(Debug)]
struct OpenNotebook {
    document: NotebookDocument,
    autosave: bool,
}

/// Fields for a cell update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct CellUpdate {
    pub source: Option<String>,
    pub cell_type: Option<CellType>,
}

/// Resolved upload/create target.
struct TargetPath {
    /// Filename without extension.
    name: String,
    /// Path as reported back to the caller (relative to the root when the
    /// requested directory was relative).
    relative: PathBuf,
    absolute: PathBuf,
}

/// Registry of open notebook documents keyed by uuid and by resolved path.
#[derive(Debug, Default)]
pub struct NotebookStore {
    config: StoreConfig,
    notebooks: HashMap<Uuid, OpenNotebook>,
    paths: HashMap<PathBuf, Uuid>,
}

impl NotebookStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            notebooks: HashMap::new(),
            paths: HashMap::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Validate notebook bytes and write them to the resolved target path
    /// with a fresh document identity stamped in. Does not open the
    /// document into the store.
    ///
    /// Returns the path actually used, relative to the root directory when
    /// the requested directory was relative.
    pub async fn upload(
        &mut self,
        data: &[u8],
        filename: &str,
        directory: Option<&Path>,
    ) -> Result<PathBuf, StoreError> {
        let target = self.resolve_target(directory, filename, false)?;
        let loaded = format::parse(data)?;

        let mut document = loaded.document;
        document.path = Some(target.absolute.clone());
        document.name = target.name;

        let json = serialize(&document)?;
        tokio::fs::write(&target.absolute, json).await?;
        info!(
            "[store] uploaded notebook {} to {:?}",
            document.uuid, target.absolute
        );
        Ok(target.relative)
    }

    /// Open a notebook file into the store, or return the already-open
    /// document for that resolved path unchanged (idempotent open).
    ///
    /// A fresh open mints a new document uuid, resets all run state, and —
    /// since opened documents autosave — writes the reset state back to
    /// disk immediately.
    pub async fn open(
        &mut self,
        filepath: &str,
        working_directory: Option<&Path>,
    ) -> Result<&NotebookDocument, StoreError> {
        let uuid = self.open_uuid(filepath, working_directory).await?;
        self.get(uuid)
    }

    async fn open_uuid(
        &mut self,
        filepath: &str,
        working_directory: Option<&Path>,
    ) -> Result<Uuid, StoreError> {
        let abs = self.resolve_filepath(filepath);
        if !abs.exists() {
            return Err(StoreError::FileNotFound(abs));
        }
        let key = canonical(&abs);
        if let Some(&existing) = self.paths.get(&key) {
            debug!("[store] open for {:?} hit open document {}", key, existing);
            return Ok(existing);
        }

        let data = tokio::fs::read(&abs).await?;
        let loaded = format::parse(&data)?;

        // The path index check and registration below form one atomic
        // step: no awaits in between.
        if let Some(&existing) = self.paths.get(&key) {
            return Ok(existing);
        }

        let mut document = loaded.document;
        document.path = Some(abs.clone());
        document.name = file_stem(&abs);
        document.working_directory = match working_directory {
            Some(dir) => canonical(dir),
            None => self.config.root_dir.clone(),
        };
        let uuid = document.uuid;
        info!("[store] opened {:?} as {}", abs, uuid);

        self.notebooks.insert(
            uuid,
            OpenNotebook {
                document,
                autosave: true,
            },
        );
        self.paths.insert(key, uuid);
        self.write_back(uuid).await?;
        Ok(uuid)
    }

    /// Upload and open in one step.
    ///
    /// Re-submitting content whose embedded document uuid matches an
    /// already-open document returns that document unchanged, before any
    /// path validation or disk write. With `autosave` off nothing ever
    /// touches disk and the document has no bound path.
    pub async fn upload_and_open(
        &mut self,
        data: &[u8],
        filename: Option<&str>,
        directory: Option<&Path>,
        working_directory: Option<&Path>,
        autosave: bool,
    ) -> Result<&NotebookDocument, StoreError> {
        let uuid = self
            .upload_and_open_uuid(data, filename, directory, working_directory, autosave)
            .await?;
        self.get(uuid)
    }

    async fn upload_and_open_uuid(
        &mut self,
        data: &[u8],
        filename: Option<&str>,
        directory: Option<&Path>,
        working_directory: Option<&Path>,
        autosave: bool,
    ) -> Result<Uuid, StoreError> {
        let loaded = format::parse(data)?;
        if let Some(embedded) = loaded.vendor.uuid {
            if self.notebooks.contains_key(&embedded) {
                debug!(
                    "[store] upload_and_open matched open document {}",
                    embedded
                );
                return Ok(embedded);
            }
        }

        let mut document = loaded.document;
        if autosave {
            if let Some(filename) = filename {
                let target = self.resolve_target(directory, filename, false)?;
                document.path = Some(target.absolute);
                document.name = target.name;
            }
        } else if let Some(filename) = filename {
            document.name = file_stem(Path::new(filename));
        }
        document.working_directory = match working_directory {
            Some(dir) => canonical(dir),
            None => self.config.root_dir.clone(),
        };

        let uuid = document.uuid;
        let path = document.path.clone();
        info!(
            "[store] upload_and_open registered {} (path: {:?}, autosave: {})",
            uuid, path, autosave
        );
        self.notebooks.insert(uuid, OpenNotebook { document, autosave });
        if let Some(path) = path {
            self.paths.insert(canonical(&path), uuid);
            self.write_back(uuid).await?;
        }
        Ok(uuid)
    }

    /// Create a new, empty notebook at the resolved target path and open
    /// it.
    pub async fn create(
        &mut self,
        filename: &str,
        directory: Option<&Path>,
        working_directory: Option<&Path>,
    ) -> Result<&NotebookDocument, StoreError> {
        let target = self.resolve_target(directory, filename, false)?;
        let mut document = NotebookDocument::new(
            target.name,
            match working_directory {
                Some(dir) => canonical(dir),
                None => self.config.root_dir.clone(),
            },
        );
        document.path = Some(target.absolute.clone());
        let uuid = document.uuid;
        info!("[store] created notebook {} at {:?}", uuid, target.absolute);

        self.notebooks.insert(
            uuid,
            OpenNotebook {
                document,
                autosave: true,
            },
        );
        self.paths.insert(canonical(&target.absolute), uuid);
        self.write_back(uuid).await?;
        self.get(uuid)
    }

    /// Re-bind an open document to a new path and write it there. With
    /// `delete_old` the previous backing file is removed (rename).
    pub async fn save_as(
        &mut self,
        uuid: Uuid,
        filename: &str,
        directory: Option<&Path>,
        overwrite: bool,
        delete_old: bool,
    ) -> Result<PathBuf, StoreError> {
        let target = self.resolve_target(directory, filename, overwrite)?;
        let nb = self
            .notebooks
            .get_mut(&uuid)
            .ok_or(StoreError::NotebookNotFound(uuid))?;
        let old_path = nb.document.path.replace(target.absolute.clone());
        nb.document.name = target.name;

        self.write_back(uuid).await?;

        if let Some(old) = old_path {
            self.paths.remove(&canonical(&old));
            if delete_old && canonical(&old) != canonical(&target.absolute) {
                match tokio::fs::remove_file(&old).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }
        self.paths.insert(canonical(&target.absolute), uuid);
        info!("[store] rebound {} to {:?}", uuid, target.absolute);
        Ok(target.absolute)
    }

    /// Remove a document from the store, deleting its backing file when
    /// one is bound.
    pub async fn delete(&mut self, uuid: Uuid) -> Result<(), StoreError> {
        let nb = self
            .notebooks
            .remove(&uuid)
            .ok_or(StoreError::NotebookNotFound(uuid))?;
        if let Some(path) = nb.document.path {
            self.paths.remove(&canonical(&path));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        info!("[store] deleted notebook {}", uuid);
        Ok(())
    }

    /// Drop every open document. Backing files are left on disk.
    pub fn delete_all(&mut self) {
        info!("[store] clearing {} open notebooks", self.notebooks.len());
        self.notebooks.clear();
        self.paths.clear();
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn get(&self, uuid: Uuid) -> Result<&NotebookDocument, StoreError> {
        self.notebooks
            .get(&uuid)
            .map(|nb| &nb.document)
            .ok_or(StoreError::NotebookNotFound(uuid))
    }

    pub fn list(&self) -> Vec<&NotebookDocument> {
        self.notebooks.values().map(|nb| &nb.document).collect()
    }

    pub fn len(&self) -> usize {
        self.notebooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty()
    }

    /// Serialize an open document to its on-disk JSON form.
    pub fn export(&self, uuid: Uuid) -> Result<String, StoreError> {
        serialize(self.get(uuid)?)
    }

    /// Document metadata for a path: live metadata when the path
    /// corresponds to an open document, otherwise read and validated from
    /// disk without opening anything into the store.
    pub async fn metadata(&self, filepath: &str) -> Result<NotebookMetadata, StoreError> {
        let abs = self.resolve_filepath(filepath);
        if !abs.exists() {
            return Err(StoreError::FileNotFound(abs));
        }
        if let Some(&uuid) = self.paths.get(&canonical(&abs)) {
            let document = self.get(uuid)?;
            return Ok(format::document_metadata(document));
        }
        let data = tokio::fs::read(&abs).await?;
        Ok(format::parse_metadata(&data)?)
    }

    pub fn cells(&self, uuid: Uuid) -> Result<&[Cell], StoreError> {
        Ok(self.get(uuid)?.cells())
    }

    pub fn cell(&self, uuid: Uuid, cell_uuid: Uuid) -> Result<&Cell, StoreError> {
        Ok(self.get(uuid)?.find_cell(cell_uuid)?)
    }

    // ── Cell edits ──────────────────────────────────────────────────

    /// Insert a new cell before `before` (or at the end), returning it.
    pub async fn create_cell(
        &mut self,
        uuid: Uuid,
        cell_type: Option<CellType>,
        source: Option<String>,
        before: Option<Uuid>,
    ) -> Result<Cell, StoreError> {
        let document = self.document_mut(uuid)?;
        let cell_uuid = document.insert_cell(
            cell_type.unwrap_or_default(),
            source.unwrap_or_default(),
            before,
        )?;
        let cell = document.find_cell(cell_uuid)?.clone();
        self.autosave(uuid).await?;
        Ok(cell)
    }

    /// Overwrite a cell's source and/or type, returning the patched cell.
    pub async fn update_cell(
        &mut self,
        uuid: Uuid,
        cell_uuid: Uuid,
        update: CellUpdate,
    ) -> Result<Cell, StoreError> {
        let document = self.document_mut(uuid)?;
        document.commit(Command::patch(cell_uuid, update.source, update.cell_type))?;
        let cell = document.find_cell(cell_uuid)?.clone();
        self.autosave(uuid).await?;
        Ok(cell)
    }

    pub async fn delete_cell(&mut self, uuid: Uuid, cell_uuid: Uuid) -> Result<(), StoreError> {
        self.document_mut(uuid)?.commit(Command::delete(cell_uuid))?;
        self.autosave(uuid).await
    }

    pub async fn move_cell(
        &mut self,
        uuid: Uuid,
        cell_uuid: Uuid,
        before: Option<Uuid>,
    ) -> Result<(), StoreError> {
        self.document_mut(uuid)?
            .commit(Command::move_to(cell_uuid, before))?;
        self.autosave(uuid).await
    }

    /// Merge a cell with the neighbor above or below it.
    pub async fn merge_cells(
        &mut self,
        uuid: Uuid,
        cell_uuid: Uuid,
        above: bool,
    ) -> Result<(), StoreError> {
        self.document_mut(uuid)?
            .commit(Command::merge(cell_uuid, above))?;
        self.autosave(uuid).await
    }

    /// Split a cell at the given character offset.
    pub async fn split_cell(
        &mut self,
        uuid: Uuid,
        cell_uuid: Uuid,
        split_location: usize,
    ) -> Result<(), StoreError> {
        self.document_mut(uuid)?
            .commit(Command::split(cell_uuid, split_location))?;
        self.autosave(uuid).await
    }

    pub async fn undo(&mut self, uuid: Uuid) -> Result<(), StoreError> {
        self.document_mut(uuid)?.undo()?;
        self.autosave(uuid).await
    }

    pub async fn redo(&mut self, uuid: Uuid) -> Result<(), StoreError> {
        self.document_mut(uuid)?.redo()?;
        self.autosave(uuid).await
    }

    /// Reset one cell's kernel results. Not undoable, not autosaved.
    pub fn clear_cell(&mut self, uuid: Uuid, cell_uuid: Uuid) -> Result<(), StoreError> {
        Ok(self.document_mut(uuid)?.clear_cell(cell_uuid)?)
    }

    /// Reset every cell's kernel results. Not undoable, not autosaved.
    pub fn clear_all_cells(&mut self, uuid: Uuid) -> Result<(), StoreError> {
        self.document_mut(uuid)?.clear_all_cells();
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    fn document_mut(&mut self, uuid: Uuid) -> Result<&mut NotebookDocument, StoreError> {
        self.notebooks
            .get_mut(&uuid)
            .map(|nb| &mut nb.document)
            .ok_or(StoreError::NotebookNotFound(uuid))
    }

    /// Write the document back to disk when its autosave policy says so.
    async fn autosave(&mut self, uuid: Uuid) -> Result<(), StoreError> {
        let nb = self
            .notebooks
            .get(&uuid)
            .ok_or(StoreError::NotebookNotFound(uuid))?;
        if nb.autosave {
            persist::write(&nb.document).await?;
        }
        Ok(())
    }

    /// Unconditional write, used at open/create/save-as time.
    async fn write_back(&mut self, uuid: Uuid) -> Result<(), StoreError> {
        let nb = self
            .notebooks
            .get(&uuid)
            .ok_or(StoreError::NotebookNotFound(uuid))?;
        persist::write(&nb.document).await
    }

    /// Resolve an upload/create target below the root directory,
    /// enforcing the `.ipynb` extension.
    fn resolve_target(
        &self,
        directory: Option<&Path>,
        filename: &str,
        allow_exists: bool,
    ) -> Result<TargetPath, StoreError> {
        let file = Path::new(filename).with_extension("ipynb");
        let mut filedir = self.config.root_dir.clone();
        let mut relative = file.clone();
        if let Some(directory) = directory {
            if directory.is_absolute() {
                filedir = directory.to_path_buf();
            } else {
                filedir = filedir.join(directory);
            }
            relative = directory.join(&file);
        }
        if !filedir.exists() {
            return Err(StoreError::DirectoryNotFound(filedir));
        }
        let absolute = filedir.join(&file);
        if !allow_exists && absolute.exists() {
            return Err(StoreError::FileAlreadyExists(absolute));
        }
        Ok(TargetPath {
            name: file_stem(&file),
            relative,
            absolute,
        })
    }

    /// Resolve a lookup path: absolute paths stand, relative paths resolve
    /// against the root directory.
    fn resolve_filepath(&self, filepath: &str) -> PathBuf {
        let path = Path::new(filepath);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.root_dir.join(path)
        }
    }
}

/// Canonical form of a path, used as the de-duplication key. Falls back
/// to canonicalizing the parent when the file does not exist yet.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf()),
            _ => path.to_path_buf(),
        }
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn serialize(document: &NotebookDocument) -> Result<String, StoreError> {
    format::serialize(document).map_err(|err| {
        StoreError::InvalidNotebook(format!("could not serialize document: {err}"))
    })
}
