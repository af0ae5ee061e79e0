// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{RecordLocation, RecordStore};
use crate::model::{
    is_record_id, EditEntry, EditGeneration, EditId, EditSource, EditSourceKind, Entry, EntryId,
    Generation, GenerationResult, IdError, TokenUsage,
};

const ENTRY_META_FILENAME: &str = "meta.yaml";
const EDIT_META_FILENAME: &str = "edit-meta.yaml";
const EDITS_DIRNAME: &str = "edits";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("yaml error at {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid id for {field}: {value:?}: {source}")]
    InvalidId {
        field: &'static str,
        value: String,
        #[source]
        source: IdError,
    },
    #[error("invalid timestamp for {field}: {value:?}: {source}")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid edit source in {path:?}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },
    #[error("invalid file name for {field}: {value:?}")]
    InvalidFileName { field: &'static str, value: String },
    #[error("refusing to write through symlink at {path:?}")]
    SymlinkRefused { path: PathBuf },
    #[error("no history entries found")]
    NoEntries,
    #[error("history entry {id} not found")]
    EntryNotFound { id: String },
    #[error("no edit entries found for history entry {entry_id}")]
    NoEdits { entry_id: String },
    #[error("edit entry {edit_id} not found in history entry {entry_id}")]
    EditNotFound { entry_id: String, edit_id: String },
    #[error("no images found in generator response")]
    NoImages,
}

impl StoreError {
    /// True for "nothing there" outcomes, as opposed to a broken disk or corrupt metadata.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoEntries
                | Self::EntryNotFound { .. }
                | Self::NoEdits { .. }
                | Self::EditNotFound { .. }
        )
    }

    /// True when a file inside a record (or a copy source) does not exist.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Writes a temp file and renames it into place without fsync.
    #[default]
    BestEffort,

    /// Also flushes file contents and the parent directory to stable storage where the
    /// platform supports it.
    Durable,
}

/// Filesystem adapter for a subproject's `history/` directory.
#[derive(Debug, Clone)]
pub struct HistoryFolder {
    root: PathBuf,
    durability: WriteDurability,
}

impl HistoryFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    /// The `history/` directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, entry_id: &EntryId) -> PathBuf {
        self.root.join(entry_id.as_str())
    }

    pub fn entry_meta_path(&self, entry_id: &EntryId) -> PathBuf {
        self.entry_dir(entry_id).join(ENTRY_META_FILENAME)
    }

    pub fn edits_dir(&self, entry_id: &EntryId) -> PathBuf {
        self.entry_dir(entry_id).join(EDITS_DIRNAME)
    }

    pub fn edit_dir(&self, entry_id: &EntryId, edit_id: &EditId) -> PathBuf {
        self.edits_dir(entry_id).join(edit_id.as_str())
    }

    pub fn edit_meta_path(&self, entry_id: &EntryId, edit_id: &EditId) -> PathBuf {
        self.edit_dir(entry_id, edit_id).join(EDIT_META_FILENAME)
    }

    /// Path of an output image produced by an edit.
    pub fn edit_output_path(&self, entry_id: &EntryId, edit_id: &EditId, output: &str) -> PathBuf {
        self.edit_dir(entry_id, edit_id).join(output)
    }

    pub fn record_dir(&self, at: &RecordLocation) -> PathBuf {
        match at {
            RecordLocation::Entry(entry_id) => self.entry_dir(entry_id),
            RecordLocation::Edit { entry_id, edit_id } => self.edit_dir(entry_id, edit_id),
        }
    }

    fn relative_record_dir(at: &RecordLocation) -> PathBuf {
        match at {
            RecordLocation::Entry(entry_id) => PathBuf::from(entry_id.as_str()),
            RecordLocation::Edit { entry_id, edit_id } => PathBuf::from(entry_id.as_str())
                .join(EDITS_DIRNAME)
                .join(edit_id.as_str()),
        }
    }

    fn write_meta(
        &self,
        at: &RecordLocation,
        meta_path: &Path,
        yaml: &str,
    ) -> Result<(), StoreError> {
        create_dir_all_safe(&self.root, &Self::relative_record_dir(at))?;
        write_atomic(&self.root, meta_path, yaml.as_bytes(), self.durability)?;
        tracing::debug!(path = %meta_path.display(), "wrote record metadata");
        Ok(())
    }

    fn read_meta_str(
        &self,
        meta_path: &Path,
        not_found: impl FnOnce() -> StoreError,
    ) -> Result<String, StoreError> {
        match fs::read_to_string(meta_path) {
            Ok(yaml) => Ok(yaml),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Err(not_found()),
            Err(source) => Err(StoreError::Io {
                path: meta_path.to_path_buf(),
                source,
            }),
        }
    }

    fn load_entry_at(&self, meta_path: &Path, id: &EntryId) -> Result<Entry, StoreError> {
        let yaml = self.read_meta_str(meta_path, || StoreError::EntryNotFound {
            id: id.to_string(),
        })?;
        let parsed: EntryYaml = serde_yaml::from_str(&yaml).map_err(|source| StoreError::Yaml {
            path: meta_path.to_path_buf(),
            source,
        })?;
        entry_from_yaml(parsed)
    }

    fn load_edit_at(
        &self,
        meta_path: &Path,
        entry_id: &EntryId,
        edit_id: &EditId,
    ) -> Result<EditEntry, StoreError> {
        let yaml = self.read_meta_str(meta_path, || StoreError::EditNotFound {
            entry_id: entry_id.to_string(),
            edit_id: edit_id.to_string(),
        })?;
        let parsed: EditEntryYaml =
            serde_yaml::from_str(&yaml).map_err(|source| StoreError::Yaml {
                path: meta_path.to_path_buf(),
                source,
            })?;
        edit_from_yaml(meta_path, parsed)
    }
}

impl RecordStore for HistoryFolder {
    fn create_record(&self, at: &RecordLocation) -> Result<(), StoreError> {
        create_dir_all_safe(&self.root, &Self::relative_record_dir(at))
    }

    fn put_file(&self, at: &RecordLocation, name: &str, contents: &[u8]) -> Result<(), StoreError> {
        validate_file_name("name", name)?;
        let path = self.record_dir(at).join(name);
        create_dir_all_safe(&self.root, &Self::relative_record_dir(at))?;
        write_atomic(&self.root, &path, contents, self.durability)?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote record file");
        Ok(())
    }

    fn copy_file(&self, at: &RecordLocation, name: &str, source: &Path) -> Result<(), StoreError> {
        let contents = fs::read(source).map_err(|err| StoreError::Io {
            path: source.to_path_buf(),
            source: err,
        })?;
        self.put_file(at, name, &contents)
    }

    fn read_file(&self, at: &RecordLocation, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_file_name("name", name)?;
        let path = self.record_dir(at).join(name);
        fs::read(&path).map_err(|source| StoreError::Io { path, source })
    }

    fn delete_record(&self, at: &RecordLocation) -> Result<(), StoreError> {
        let dir = self.record_dir(at);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "removed record directory");
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path: dir, source }),
        }
    }

    fn save_entry(&self, entry: &Entry) -> Result<(), StoreError> {
        let meta_path = self.entry_meta_path(&entry.id);
        let yaml = serde_yaml::to_string(&entry_to_yaml(entry)).map_err(|source| {
            StoreError::Yaml {
                path: meta_path.clone(),
                source,
            }
        })?;
        self.write_meta(&RecordLocation::entry(&entry.id), &meta_path, &yaml)
    }

    fn entry_by_id(&self, id: &EntryId) -> Result<Entry, StoreError> {
        self.load_entry_at(&self.entry_meta_path(id), id)
    }

    fn list_entries(&self) -> Result<Vec<Entry>, StoreError> {
        let mut entries = Vec::new();
        for (name, dir) in list_record_dirs(&self.root)? {
            let Ok(id) = EntryId::new(name.as_str()) else {
                continue;
            };
            match self.load_entry_at(&dir.join(ENTRY_META_FILENAME), &id) {
                Ok(entry) if entry.id == id => entries.push(entry),
                Ok(entry) => {
                    tracing::warn!(dir = %name, id = %entry.id, "skipping mismatched entry");
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!(dir = %name, "skipping entry without metadata");
                }
                Err(err) => {
                    tracing::warn!(dir = %name, error = %err, "skipping unreadable entry");
                }
            }
        }

        entries.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(entries)
    }

    fn save_edit(&self, entry_id: &EntryId, edit: &EditEntry) -> Result<(), StoreError> {
        let meta_path = self.edit_meta_path(entry_id, &edit.id);
        let yaml = serde_yaml::to_string(&edit_to_yaml(edit)).map_err(|source| {
            StoreError::Yaml {
                path: meta_path.clone(),
                source,
            }
        })?;
        self.write_meta(&RecordLocation::edit(entry_id, &edit.id), &meta_path, &yaml)
    }

    fn edit_by_id(&self, entry_id: &EntryId, edit_id: &EditId) -> Result<EditEntry, StoreError> {
        self.load_edit_at(&self.edit_meta_path(entry_id, edit_id), entry_id, edit_id)
    }

    fn list_edits(&self, entry_id: &EntryId) -> Result<Vec<EditEntry>, StoreError> {
        let mut edits = Vec::new();
        for (name, dir) in list_record_dirs(&self.edits_dir(entry_id))? {
            let Ok(edit_id) = EditId::new(name.as_str()) else {
                continue;
            };
            match self.load_edit_at(&dir.join(EDIT_META_FILENAME), entry_id, &edit_id) {
                Ok(edit) if edit.id == edit_id => edits.push(edit),
                Ok(edit) => {
                    tracing::warn!(dir = %name, id = %edit.id, "skipping mismatched edit");
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!(dir = %name, "skipping edit without metadata");
                }
                Err(err) => {
                    tracing::warn!(dir = %name, error = %err, "skipping unreadable edit");
                }
            }
        }

        edits.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(edits)
    }
}

include!("history_folder/helpers.rs");

#[cfg(test)]
mod tests;
