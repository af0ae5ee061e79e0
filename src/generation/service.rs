// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    EditOutcome, EditSpec, GenerationError, Operation, PersistenceWarning, RunOutcome, Spec,
};
use crate::config::ServiceConfig;
use crate::generator::{GenerateParams, GenerateResponse, Generator, GeneratorError};
use crate::model::{EditEntry, Entry, EntryId, CHARACTER_FILE, CONTEXT_FILE, PROMPT_FILE};
use crate::store::{HistoryFolder, RecordLocation, RecordStore, StoreError};
use crate::validate::{validate_edit_spec, validate_spec};

/// Runs generations and edits against one history store.
pub struct GenerationService<S = HistoryFolder> {
    config: ServiceConfig,
    generator: Arc<dyn Generator>,
    store: S,
}

impl GenerationService<HistoryFolder> {
    /// Opens the history folder at `history_dir` with the config's durability, so the store
    /// and the config cannot disagree.
    pub fn open(
        config: ServiceConfig,
        generator: Arc<dyn Generator>,
        history_dir: impl Into<PathBuf>,
    ) -> Self {
        let store = config.history_folder(history_dir);
        Self::new(config, generator, store)
    }
}

impl<S: RecordStore> GenerationService<S> {
    pub fn new(config: ServiceConfig, generator: Arc<dyn Generator>, store: S) -> Self {
        Self {
            config,
            generator,
            store,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generates (or regenerates) images and records the attempt as a new history entry.
    ///
    /// On any failure after the entry directory was created the directory is removed again.
    pub async fn run(
        &self,
        spec: Spec,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, GenerationError> {
        validate_spec(&spec)?;

        let source_entry = match &spec.source_entry_id {
            Some(source_id) => Some(self.store.entry_by_id(source_id).map_err(|source| {
                GenerationError::Store {
                    context: "failed to load source entry",
                    source,
                    warnings: Vec::new(),
                }
            })?),
            None => None,
        };
        let mut entry = source_entry.as_ref().map_or_else(Entry::new, Entry::from_source);
        entry.generation.prompt_file = PROMPT_FILE.to_owned();
        entry.generation.input_images = input_image_names(&spec);

        let at = RecordLocation::entry(&entry.id);
        let mut warnings = Vec::new();

        if let Err(source) = self.store.create_record(&at) {
            return Err(GenerationError::Store {
                context: "failed to create history entry",
                source,
                warnings,
            });
        }
        if let Err(source) = self.store.save_prompt(&entry.id, &spec.prompt) {
            self.abandon_entry(&mut entry, &source, &mut warnings);
            return Err(GenerationError::Store {
                context: "failed to save prompt",
                source,
                warnings,
            });
        }
        if let Err(err) = self.store.save_input_images(&entry.id, &spec.image_paths) {
            push_warning(&mut warnings, "failed to save input images", err);
        }
        entry.generation.context_file = self.snapshot(
            &entry.id,
            Snapshot {
                name: CONTEXT_FILE,
                requested: spec.context_file.as_deref(),
                inherited: source_entry.as_ref().and_then(|source| {
                    let name = source.generation.context_file.as_deref()?;
                    Some((&source.id, name))
                }),
                context: "failed to save context snapshot",
            },
            &mut warnings,
        );
        entry.generation.character_file = self.snapshot(
            &entry.id,
            Snapshot {
                name: CHARACTER_FILE,
                requested: spec.character_file.as_deref(),
                inherited: source_entry.as_ref().and_then(|source| {
                    let name = source.generation.character_file.as_deref()?;
                    Some((&source.id, name))
                }),
                context: "failed to save character snapshot",
            },
            &mut warnings,
        );

        let params = GenerateParams {
            model: self.config.resolve_model(&spec.model),
            prompt: spec.prompt,
            image_paths: spec.image_paths,
            aspect_ratio: spec.aspect_ratio,
            image_size: spec.image_size,
        };
        let response = match self.call_generator(params, cancel).await {
            Ok(response) => response,
            Err(source) => {
                self.abandon_entry(&mut entry, &source, &mut warnings);
                return Err(GenerationError::GenerationFailed {
                    operation: Operation::Generate,
                    source,
                    warnings,
                });
            }
        };

        let output_images = match self.store.save_output_images(&at, &response.images) {
            Ok(names) => names,
            Err(source) => {
                self.abandon_entry(&mut entry, &source, &mut warnings);
                return Err(GenerationError::Store {
                    context: "failed to save output images",
                    source,
                    warnings,
                });
            }
        };
        entry.result.mark_succeeded(output_images.clone(), response.token_usage);
        if let Err(source) = self.store.save_entry(&entry) {
            self.abandon_entry(&mut entry, &source, &mut warnings);
            return Err(GenerationError::Store {
                context: "failed to save entry metadata",
                source,
                warnings,
            });
        }

        tracing::info!(
            entry_id = %entry.id,
            outputs = output_images.len(),
            total_tokens = response.token_usage.total,
            warnings = warnings.len(),
            "generation recorded"
        );
        Ok(RunOutcome {
            entry_id: entry.id,
            output_images,
            text: response.text,
            token_usage: response.token_usage,
            warnings,
        })
    }

    /// Edits one image of an existing entry and records the attempt under its `edits/`.
    ///
    /// Only the new edit directory is removed on failure; the parent entry is never touched.
    pub async fn edit(
        &self,
        spec: EditSpec,
        cancel: &CancellationToken,
    ) -> Result<EditOutcome, GenerationError> {
        validate_edit_spec(&spec)?;

        self.store
            .entry_by_id(&spec.entry_id)
            .map_err(|source| GenerationError::Store {
                context: "failed to load entry",
                source,
                warnings: Vec::new(),
            })?;

        let mut edit = EditEntry::new(spec.source);
        edit.generation.aspect_ratio = spec.aspect_ratio.clone().filter(|v| !v.is_empty());
        edit.generation.image_size = spec.image_size.clone().filter(|v| !v.is_empty());

        let entry_id = spec.entry_id;
        let at = RecordLocation::edit(&entry_id, &edit.id);
        let mut warnings = Vec::new();

        if let Err(source) = self.store.create_record(&at) {
            return Err(GenerationError::Store {
                context: "failed to create edit",
                source,
                warnings,
            });
        }
        if let Err(source) = self.store.save_edit_prompt(&entry_id, &edit.id, &spec.prompt) {
            self.abandon_edit(&entry_id, &mut edit, &source, &mut warnings);
            return Err(GenerationError::Store {
                context: "failed to save edit prompt",
                source,
                warnings,
            });
        }

        let params = GenerateParams {
            model: self.config.resolve_model(&spec.model),
            prompt: spec.prompt,
            image_paths: vec![spec.source_image_path],
            aspect_ratio: spec.aspect_ratio,
            image_size: spec.image_size,
        };
        let response = match self.call_generator(params, cancel).await {
            Ok(response) => response,
            Err(source) => {
                self.abandon_edit(&entry_id, &mut edit, &source, &mut warnings);
                return Err(GenerationError::GenerationFailed {
                    operation: Operation::Edit,
                    source,
                    warnings,
                });
            }
        };

        let output_images = match self.store.save_output_images(&at, &response.images) {
            Ok(names) => names,
            Err(source) => {
                self.abandon_edit(&entry_id, &mut edit, &source, &mut warnings);
                return Err(GenerationError::Store {
                    context: "failed to save output images",
                    source,
                    warnings,
                });
            }
        };
        edit.result.mark_succeeded(output_images.clone(), response.token_usage);
        if let Err(source) = self.store.save_edit(&entry_id, &edit) {
            self.abandon_edit(&entry_id, &mut edit, &source, &mut warnings);
            return Err(GenerationError::Store {
                context: "failed to save edit metadata",
                source,
                warnings,
            });
        }

        tracing::info!(
            entry_id = %entry_id,
            edit_id = %edit.id,
            source = %edit.source.kind(),
            outputs = output_images.len(),
            "edit recorded"
        );
        Ok(EditOutcome {
            edit_id: edit.id,
            output_images,
            text: response.text,
            token_usage: response.token_usage,
            warnings,
        })
    }

    /// Copies a context or character snapshot into the new entry and returns the file name
    /// to record, or `None` when the entry ends up without that file.
    ///
    /// A file named by the request wins. Otherwise a regeneration carries the source entry's
    /// snapshot over, so the recorded name always refers to a file in the entry's own
    /// directory.
    fn snapshot(
        &self,
        entry_id: &EntryId,
        snapshot: Snapshot<'_>,
        warnings: &mut Vec<PersistenceWarning>,
    ) -> Option<String> {
        let at = RecordLocation::entry(entry_id);

        if let Some(path) = snapshot.requested.filter(|path| path.is_file()) {
            match self.store.copy_file(&at, snapshot.name, path) {
                Ok(()) => return Some(snapshot.name.to_owned()),
                Err(err) => push_warning(warnings, snapshot.context, err),
            }
        }

        let (source_id, name) = snapshot.inherited?;
        let carried = self
            .store
            .read_file(&RecordLocation::entry(source_id), name)
            .and_then(|contents| self.store.put_file(&at, name, &contents));
        match carried {
            Ok(()) => Some(name.to_owned()),
            Err(err) if err.is_missing_file() => {
                tracing::debug!(source = %source_id, file = name, "source entry has no snapshot");
                None
            }
            Err(err) => {
                push_warning(warnings, "failed to carry over source snapshot", err);
                None
            }
        }
    }

    async fn call_generator(
        &self,
        params: GenerateParams,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, GeneratorError> {
        if cancel.is_cancelled() {
            return Err(GeneratorError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GeneratorError::Cancelled),
            response = self.generator.generate(params) => response,
        }
    }

    fn abandon_entry(
        &self,
        entry: &mut Entry,
        cause: &dyn std::error::Error,
        warnings: &mut Vec<PersistenceWarning>,
    ) {
        entry.result.mark_failed(cause.to_string());
        let entry = &*entry;
        self.roll_back(
            &RecordLocation::entry(&entry.id),
            || self.store.save_entry(entry),
            warnings,
        );
    }

    fn abandon_edit(
        &self,
        entry_id: &EntryId,
        edit: &mut EditEntry,
        cause: &dyn std::error::Error,
        warnings: &mut Vec<PersistenceWarning>,
    ) {
        edit.result.mark_failed(cause.to_string());
        let edit = &*edit;
        self.roll_back(
            &RecordLocation::edit(entry_id, &edit.id),
            || self.store.save_edit(entry_id, edit),
            warnings,
        );
    }

    /// Removes the record; when that fails, leaves a failed-state record in its place.
    fn roll_back(
        &self,
        at: &RecordLocation,
        write_failed_state: impl FnOnce() -> Result<(), StoreError>,
        warnings: &mut Vec<PersistenceWarning>,
    ) {
        let Err(err) = self.store.delete_record(at) else {
            tracing::debug!(record = ?at, "rolled back record");
            return;
        };
        push_warning(warnings, "failed to remove record", err);
        if let Err(err) = write_failed_state() {
            push_warning(warnings, "failed to record failed state", err);
        }
    }
}

struct Snapshot<'a> {
    /// File name inside the new entry when copied from `requested`.
    name: &'static str,
    requested: Option<&'a Path>,
    /// Source entry and the snapshot file name it recorded.
    inherited: Option<(&'a EntryId, &'a str)>,
    context: &'static str,
}

fn push_warning(warnings: &mut Vec<PersistenceWarning>, context: &'static str, error: StoreError) {
    tracing::warn!(error = %error, "{context}");
    warnings.push(PersistenceWarning { context, error });
}

fn input_image_names(spec: &Spec) -> Vec<String> {
    if !spec.input_image_names.is_empty() {
        return spec.input_image_names.clone();
    }
    spec.image_paths
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}
