// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for generation history on disk.
//!
//! The history folder is an append-mostly record store keyed by time-ordered ids: every
//! generation owns `history/<entry-id>/` and every edit owns
//! `history/<entry-id>/edits/<edit-id>/`. [`RecordStore`] is the seam the generation service
//! talks to; [`HistoryFolder`] is the filesystem adapter that keeps the on-disk layout.

use std::path::{Path, PathBuf};

use crate::generator::GeneratedImage;
use crate::model::{
    EditEntry, EditId, Entry, EntryId, RunId, CHARACTER_FILE, CONTEXT_FILE, EDIT_PROMPT_FILE,
    PROMPT_FILE,
};

pub mod history_folder;

pub use history_folder::{HistoryFolder, StoreError, WriteDurability};

/// Addresses one record directory in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLocation {
    Entry(EntryId),
    Edit { entry_id: EntryId, edit_id: EditId },
}

impl RecordLocation {
    pub fn entry(entry_id: &EntryId) -> Self {
        Self::Entry(entry_id.clone())
    }

    pub fn edit(entry_id: &EntryId, edit_id: &EditId) -> Self {
        Self::Edit {
            entry_id: entry_id.clone(),
            edit_id: edit_id.clone(),
        }
    }
}

/// Record store for generation entries and their edit chains.
///
/// Implementors provide the primitive put/get/list/delete operations; the auxiliary-file
/// helpers are built on top of them so the service never needs to know how records are laid
/// out.
pub trait RecordStore: Send + Sync {
    /// Creates the record directory (and its parents) if missing.
    fn create_record(&self, at: &RecordLocation) -> Result<(), StoreError>;

    /// Writes a named file inside a record, replacing any previous contents atomically.
    fn put_file(&self, at: &RecordLocation, name: &str, contents: &[u8]) -> Result<(), StoreError>;

    /// Copies `source` into a record under `name`.
    fn copy_file(&self, at: &RecordLocation, name: &str, source: &Path) -> Result<(), StoreError>;

    fn read_file(&self, at: &RecordLocation, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Removes the record directory and everything below it. Missing records are not an error.
    fn delete_record(&self, at: &RecordLocation) -> Result<(), StoreError>;

    fn save_entry(&self, entry: &Entry) -> Result<(), StoreError>;

    fn entry_by_id(&self, id: &EntryId) -> Result<Entry, StoreError>;

    /// Completed entries in creation order. Unreadable records are skipped.
    fn list_entries(&self) -> Result<Vec<Entry>, StoreError>;

    fn save_edit(&self, entry_id: &EntryId, edit: &EditEntry) -> Result<(), StoreError>;

    fn edit_by_id(&self, entry_id: &EntryId, edit_id: &EditId) -> Result<EditEntry, StoreError>;

    /// Completed edits of one entry in creation order. Unreadable records are skipped.
    fn list_edits(&self, entry_id: &EntryId) -> Result<Vec<EditEntry>, StoreError>;

    fn cleanup_entry(&self, entry_id: &EntryId) -> Result<(), StoreError> {
        self.delete_record(&RecordLocation::entry(entry_id))
    }

    /// Removes one edit directory; the parent entry and its other edits stay.
    fn cleanup_edit(&self, entry_id: &EntryId, edit_id: &EditId) -> Result<(), StoreError> {
        self.delete_record(&RecordLocation::edit(entry_id, edit_id))
    }

    fn latest_entry(&self) -> Result<Entry, StoreError> {
        self.list_entries()?.pop().ok_or(StoreError::NoEntries)
    }

    fn latest_edit(&self, entry_id: &EntryId) -> Result<EditEntry, StoreError> {
        self.list_edits(entry_id)?
            .pop()
            .ok_or_else(|| StoreError::NoEdits {
                entry_id: entry_id.to_string(),
            })
    }

    /// Number of readable edits, or 0 when the edits cannot be listed.
    fn count_edits(&self, entry_id: &EntryId) -> usize {
        self.list_edits(entry_id).map(|edits| edits.len()).unwrap_or(0)
    }

    fn save_prompt(&self, entry_id: &EntryId, prompt: &str) -> Result<(), StoreError> {
        self.put_file(&RecordLocation::entry(entry_id), PROMPT_FILE, prompt.as_bytes())
    }

    fn save_edit_prompt(
        &self,
        entry_id: &EntryId,
        edit_id: &EditId,
        prompt: &str,
    ) -> Result<(), StoreError> {
        self.put_file(
            &RecordLocation::edit(entry_id, edit_id),
            EDIT_PROMPT_FILE,
            prompt.as_bytes(),
        )
    }

    fn load_prompt(&self, entry_id: &EntryId) -> Result<String, StoreError> {
        let bytes = self.read_file(&RecordLocation::entry(entry_id), PROMPT_FILE)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn load_edit_prompt(&self, entry_id: &EntryId, edit_id: &EditId) -> Result<String, StoreError> {
        let bytes = self.read_file(&RecordLocation::edit(entry_id, edit_id), EDIT_PROMPT_FILE)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Copies every input image into the entry under its own file name.
    ///
    /// All copies are attempted even when one fails; the first failure is returned.
    fn save_input_images(&self, entry_id: &EntryId, paths: &[PathBuf]) -> Result<(), StoreError> {
        let at = RecordLocation::entry(entry_id);
        let mut first_err = None;
        for path in paths {
            let outcome = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => self.copy_file(&at, name, path),
                None => Err(StoreError::InvalidFileName {
                    field: "input_images[]",
                    value: path.display().to_string(),
                }),
            };
            if let Err(err) = outcome {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn save_context_file(&self, entry_id: &EntryId, source: &Path) -> Result<(), StoreError> {
        self.copy_file(&RecordLocation::entry(entry_id), CONTEXT_FILE, source)
    }

    fn save_character_file(&self, entry_id: &EntryId, source: &Path) -> Result<(), StoreError> {
        self.copy_file(&RecordLocation::entry(entry_id), CHARACTER_FILE, source)
    }

    /// Writes generated images as `output-<run-id>-<n>.<ext>` and returns their file names.
    ///
    /// Images without data are skipped; a response with no usable image is an error.
    fn save_output_images(
        &self,
        at: &RecordLocation,
        images: &[GeneratedImage],
    ) -> Result<Vec<String>, StoreError> {
        let run_id = RunId::generate();
        let mut saved = Vec::with_capacity(images.len());
        for image in images.iter().filter(|image| !image.data.is_empty()) {
            let name = format!("output-{run_id}-{}{}", saved.len() + 1, image.extension());
            self.put_file(at, &name, &image.data)?;
            saved.push(name);
        }
        if saved.is_empty() {
            return Err(StoreError::NoImages);
        }
        Ok(saved)
    }
}
