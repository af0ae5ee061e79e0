// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![cfg(test)]

use super::edit::{EditEntry, EditSource};
use super::entry::{Entry, TokenUsage, CHARACTER_FILE, CONTEXT_FILE, PROMPT_FILE};

pub(crate) fn usage(prompt: u64, candidates: u64) -> TokenUsage {
    TokenUsage {
        prompt,
        candidates,
        total: prompt + candidates,
        ..TokenUsage::default()
    }
}

/// A successful generation with every optional field populated.
pub(crate) fn entry_full() -> Entry {
    let mut entry = Entry::new();
    entry.generation.prompt_file = PROMPT_FILE.to_owned();
    entry.generation.input_images = vec!["front.png".to_owned(), "side.jpg".to_owned()];
    entry.generation.context_file = Some(CONTEXT_FILE.to_owned());
    entry.generation.character_file = Some(CHARACTER_FILE.to_owned());
    entry.result.mark_succeeded(
        vec!["output-0190-1.png".to_owned(), "output-0190-2.png".to_owned()],
        TokenUsage {
            cached: 12,
            thoughts: 7,
            ..usage(100, 50)
        },
    );
    entry
}

/// A generation with only the required fields populated.
pub(crate) fn entry_minimal() -> Entry {
    let mut entry = Entry::new();
    entry.generation.prompt_file = PROMPT_FILE.to_owned();
    entry.generation.input_images = vec!["front.png".to_owned()];
    entry
}

pub(crate) fn edit_of_generation(output: &str) -> EditEntry {
    let mut edit = EditEntry::new(EditSource::Generation {
        output: output.to_owned(),
    });
    edit.generation.aspect_ratio = Some("16:9".to_owned());
    edit.result
        .mark_succeeded(vec!["output-0191-1.png".to_owned()], usage(80, 40));
    edit
}

pub(crate) fn edit_of_edit(prior: &EditEntry) -> EditEntry {
    let output = prior
        .result
        .output_images
        .first()
        .cloned()
        .unwrap_or_else(|| "output-0191-1.png".to_owned());
    let mut edit = EditEntry::new(EditSource::Edit {
        edit_id: prior.id.clone(),
        output,
    });
    edit.generation.image_size = Some("2K".to_owned());
    edit.result
        .mark_succeeded(vec!["output-0192-1.png".to_owned()], usage(90, 45));
    edit
}
