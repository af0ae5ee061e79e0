// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use pictrail::model::{EditEntry, EditSource, Entry, TokenUsage};
use pictrail::store::{HistoryFolder, RecordStore};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy)]
pub enum Case {
    HistorySmall,
    HistoryMedium,
    HistoryLarge,
}

impl Case {
    pub fn entries(self) -> usize {
        match self {
            Self::HistorySmall => 10,
            Self::HistoryMedium => 100,
            Self::HistoryLarge => 500,
        }
    }

    pub fn edits_per_entry(self) -> usize {
        match self {
            Self::HistorySmall => 1,
            Self::HistoryMedium | Self::HistoryLarge => 3,
        }
    }
}

pub fn entry(n: usize) -> Entry {
    let mut entry = Entry::new();
    entry.generation.prompt_file = "prompt.txt".to_owned();
    entry.generation.input_images = vec![format!("input-{n}.png"), "style.jpg".to_owned()];
    entry.generation.context_file = Some("context.md".to_owned());
    entry.result.mark_succeeded(
        vec![format!("output-{n}-1.png"), format!("output-{n}-2.png")],
        TokenUsage {
            prompt: 1_000 + n as u64,
            candidates: 1_290,
            total: 2_290 + n as u64,
            ..TokenUsage::default()
        },
    );
    entry
}

/// Builds an edit chain: the first edit starts from the generation, each later one from
/// the edit before it.
pub fn edit_chain(entry: &Entry, len: usize) -> Vec<EditEntry> {
    let mut chain: Vec<EditEntry> = Vec::with_capacity(len);
    for n in 0..len {
        let source = match chain.last() {
            Some(prior) => EditSource::Edit {
                edit_id: prior.id.clone(),
                output: prior.result.output_images[0].clone(),
            },
            None => EditSource::Generation {
                output: entry.result.output_images[0].clone(),
            },
        };
        let mut edit = EditEntry::new(source);
        edit.generation.aspect_ratio = Some("16:9".to_owned());
        edit.result
            .mark_succeeded(vec![format!("output-edit-{n}-1.png")], TokenUsage::default());
        chain.push(edit);
    }
    chain
}

/// A history directory populated for `case`. The directory lives as long as the returned
/// `TempDir`.
pub fn history(case: Case) -> (TempDir, HistoryFolder) {
    let dir = TempDir::new().expect("tempdir");
    let store = HistoryFolder::new(dir.path().join("history"));
    for n in 0..case.entries() {
        let entry = entry(n);
        store
            .save_prompt(&entry.id, "a red ball on a wooden table")
            .expect("save_prompt");
        store.save_entry(&entry).expect("save_entry");
        for edit in edit_chain(&entry, case.edits_per_entry()) {
            store.save_edit(&entry.id, &edit).expect("save_edit");
        }
    }
    (dir, store)
}
