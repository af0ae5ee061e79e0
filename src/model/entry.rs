// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::{DateTime, SubsecRound, Utc};

use super::ids::EntryId;

pub const PROMPT_FILE: &str = "prompt.txt";
pub const CONTEXT_FILE: &str = "context.md";
pub const CHARACTER_FILE: &str = "character.md";

/// One generation attempt, persisted as `history/<id>/meta.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub created_at: DateTime<Utc>,
    pub generation: Generation,
    pub result: GenerationResult,
}

/// Inputs of an attempt, fixed when the entry is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub prompt_file: String,
    pub input_images: Vec<String>,
    pub context_file: Option<String>,
    pub character_file: Option<String>,
}

/// Outcome of an attempt. Shared by generation entries and edit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub success: bool,
    pub output_images: Vec<String>,
    pub token_usage: TokenUsage,
    pub error_message: Option<String>,
}

/// Provider-reported token accounting, stored verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt: u64,
    pub candidates: u64,
    pub total: u64,
    pub cached: u64,
    pub thoughts: u64,
}

impl Entry {
    pub fn new() -> Self {
        Self {
            id: EntryId::generate(),
            created_at: now_seconds(),
            generation: Generation::default(),
            result: GenerationResult::default(),
        }
    }

    /// Starts a regeneration of `source`: a fresh id with the source's input metadata.
    pub fn from_source(source: &Entry) -> Self {
        let mut entry = Self::new();
        entry.generation = source.generation.clone();
        entry
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationResult {
    pub fn mark_succeeded(&mut self, output_images: Vec<String>, token_usage: TokenUsage) {
        self.success = true;
        self.output_images = output_images;
        self.token_usage = token_usage;
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.success = false;
        self.output_images.clear();
        self.error_message = Some(message.into());
    }
}

// `created_at` is persisted with second precision; truncating up front keeps a saved entry
// equal to its reloaded copy.
pub(crate) fn now_seconds() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::{Entry, TokenUsage};

    #[test]
    fn from_source_issues_new_id_and_copies_inputs() {
        let mut parent = Entry::new();
        parent.generation.prompt_file = "prompt.txt".to_owned();
        parent.generation.input_images = vec!["a.png".to_owned(), "b.png".to_owned()];
        parent.generation.context_file = Some("context.md".to_owned());
        parent.generation.character_file = Some("character.md".to_owned());
        parent.result.mark_succeeded(vec!["output-x-1.png".to_owned()], TokenUsage::default());

        let child = Entry::from_source(&parent);
        assert_ne!(child.id, parent.id);
        assert_eq!(child.generation, parent.generation);
        assert!(!child.result.success);
        assert!(child.result.output_images.is_empty());

        parent.generation.input_images.push("c.png".to_owned());
        assert_eq!(child.generation.input_images, vec!["a.png", "b.png"]);
    }

    #[test]
    fn mark_failed_clears_outputs() {
        let mut entry = Entry::new();
        entry.result.mark_succeeded(vec!["output-x-1.png".to_owned()], TokenUsage::default());
        entry.result.mark_failed("boom");
        assert!(!entry.result.success);
        assert!(entry.result.output_images.is_empty());
        assert_eq!(entry.result.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn created_at_has_no_subsecond_part() {
        let entry = Entry::new();
        assert_eq!(entry.created_at.timestamp_subsec_nanos(), 0);
    }
}
