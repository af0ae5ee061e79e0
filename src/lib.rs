// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pictrail: generation history and edit chains for prompt-driven image generation.
//!
//! Every generation attempt becomes a directory under a subproject's `history/`, holding
//! the prompt, copies of the inputs, the generated images and a `meta.yaml`. Edits of an
//! output nest under the entry's `edits/` and link back to the artifact they started from.
//! [`generation::GenerationService`] runs attempts against a pluggable
//! [`generator::Generator`] and keeps the history free of half-finished records.

pub mod config;
pub mod generation;
pub mod generator;
pub mod model;
pub mod paths;
pub mod store;
pub mod validate;
