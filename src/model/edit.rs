// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::entry::{now_seconds, GenerationResult};
use super::ids::EditId;

pub const EDIT_PROMPT_FILE: &str = "edit-prompt.txt";

/// One edit of a single output image, persisted as
/// `history/<entry-id>/edits/<edit-id>/edit-meta.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEntry {
    pub id: EditId,
    pub created_at: DateTime<Utc>,
    pub source: EditSource,
    pub generation: EditGeneration,
    pub result: GenerationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditGeneration {
    pub prompt_file: String,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
}

/// The artifact an edit was derived from.
///
/// Each edit points one hop back: either at an output of the parent generation or at an
/// output of an earlier edit of the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditSource {
    Generation { output: String },
    Edit { edit_id: EditId, output: String },
}

impl EditSource {
    pub fn kind(&self) -> EditSourceKind {
        match self {
            Self::Generation { .. } => EditSourceKind::Generate,
            Self::Edit { .. } => EditSourceKind::Edit,
        }
    }

    pub fn edit_id(&self) -> Option<&EditId> {
        match self {
            Self::Generation { .. } => None,
            Self::Edit { edit_id, .. } => Some(edit_id),
        }
    }

    /// File name of the source image inside the generation or edit directory.
    pub fn output(&self) -> &str {
        match self {
            Self::Generation { output } | Self::Edit { output, .. } => output,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditSourceKind {
    Generate,
    Edit,
}

impl EditSourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for EditSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown edit source type: {value:?} (expected \"generate\" or \"edit\")")]
pub struct ParseEditSourceKindError {
    value: String,
}

impl FromStr for EditSourceKind {
    type Err = ParseEditSourceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(Self::Generate),
            "edit" => Ok(Self::Edit),
            other => Err(ParseEditSourceKindError {
                value: other.to_owned(),
            }),
        }
    }
}

impl EditEntry {
    pub fn new(source: EditSource) -> Self {
        Self {
            id: EditId::generate(),
            created_at: now_seconds(),
            source,
            generation: EditGeneration {
                prompt_file: EDIT_PROMPT_FILE.to_owned(),
                ..EditGeneration::default()
            },
            result: GenerationResult::default(),
        }
    }
}
