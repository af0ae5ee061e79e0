// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Record types for the generation history.
//!
//! An [`Entry`] is one generation attempt; each entry can own any number of [`EditEntry`]
//! records that form a backward-linked chain through [`EditSource`].

pub mod edit;
pub mod entry;
pub(crate) mod fixtures;
pub mod ids;

pub use edit::{
    EditEntry, EditGeneration, EditSource, EditSourceKind, ParseEditSourceKindError,
    EDIT_PROMPT_FILE,
};
pub use entry::{
    Entry, Generation, GenerationResult, TokenUsage, CHARACTER_FILE, CONTEXT_FILE, PROMPT_FILE,
};
pub use ids::{is_record_id, EditId, EntryId, Id, IdError, RunId};
