// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Generation and edit workflows over the history store.
//!
//! Both workflows validate first, write the request (prompt, inputs) into a fresh record
//! directory, call the [`Generator`](crate::generator::Generator), and either finalize the
//! record or remove it again. A failed call never leaves a record behind.

use std::fmt;
use std::path::PathBuf;

use crate::generator::GeneratorError;
use crate::model::{EditId, EditSource, EntryId, TokenUsage};
use crate::store::StoreError;
use crate::validate::ValidationError;

mod service;

pub use service::GenerationService;

/// A generation or regeneration request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spec {
    /// Empty selects the configured default model.
    pub model: String,
    pub prompt: String,
    pub image_paths: Vec<PathBuf>,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
    /// Names recorded in the entry metadata. Empty records the file names of `image_paths`.
    pub input_image_names: Vec<String>,
    /// Set when regenerating from an existing entry.
    pub source_entry_id: Option<EntryId>,
    /// Snapshotted into the entry as `context.md` when present on disk.
    pub context_file: Option<PathBuf>,
    /// Snapshotted into the entry as `character.md` when present on disk.
    pub character_file: Option<PathBuf>,
}

/// An edit of one image of an existing entry.
///
/// The caller resolves the artifact to edit into `source_image_path` plus `source`; the
/// service does not walk the edit chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSpec {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
    pub source_image_path: PathBuf,
    pub entry_id: EntryId,
    pub source: EditSource,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub entry_id: EntryId,
    pub output_images: Vec<String>,
    pub text: Option<String>,
    pub token_usage: TokenUsage,
    pub warnings: Vec<PersistenceWarning>,
}

#[derive(Debug)]
pub struct EditOutcome {
    pub edit_id: EditId,
    pub output_images: Vec<String>,
    pub text: Option<String>,
    pub token_usage: TokenUsage,
    pub warnings: Vec<PersistenceWarning>,
}

/// A best-effort write that failed without failing the operation.
#[derive(Debug)]
pub struct PersistenceWarning {
    pub context: &'static str,
    pub error: StoreError,
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    Edit,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
        })
    }
}

/// Failure of a run or edit.
///
/// `warnings` lists secondary problems hit while rolling back (for example a record directory
/// that could not be removed). They never replace the primary error.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to {operation} image: {source}")]
    GenerationFailed {
        operation: Operation,
        #[source]
        source: GeneratorError,
        warnings: Vec<PersistenceWarning>,
    },
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
        warnings: Vec<PersistenceWarning>,
    },
}

impl GenerationError {
    pub fn warnings(&self) -> &[PersistenceWarning] {
        match self {
            Self::Validation(_) => &[],
            Self::GenerationFailed { warnings, .. } | Self::Store { warnings, .. } => warnings,
        }
    }

    /// True when the request referenced an entry or edit that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_not_found())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::GenerationFailed {
                source: GeneratorError::Cancelled,
                ..
            }
        )
    }
}
