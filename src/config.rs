// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Process-wide settings, built once at startup and handed to the service.

use std::path::PathBuf;

use crate::store::{HistoryFolder, WriteDurability};

pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

pub const MODEL_ENV: &str = "PICTRAIL_MODEL";
pub const DURABLE_WRITES_ENV: &str = "PICTRAIL_DURABLE_WRITES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Model used when a request leaves its model empty.
    pub default_model: String,
    /// Applies to stores opened through [`ServiceConfig::history_folder`]. A store handed to
    /// [`GenerationService::new`](crate::generation::GenerationService::new) keeps its own
    /// setting.
    pub durability: WriteDurability,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_owned(),
            durability: WriteDurability::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads `PICTRAIL_MODEL` and `PICTRAIL_DURABLE_WRITES`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(model) = lookup(MODEL_ENV)
            .map(|raw| raw.trim().to_owned())
            .filter(|model| !model.is_empty())
        {
            config.default_model = model;
        }

        if lookup(DURABLE_WRITES_ENV).is_some_and(|raw| parse_flag(&raw)) {
            config.durability = WriteDurability::Durable;
        }

        config
    }

    /// Opens the history folder at `history_dir` with the configured durability.
    pub fn history_folder(&self, history_dir: impl Into<PathBuf>) -> HistoryFolder {
        HistoryFolder::new(history_dir).with_durability(self.durability)
    }

    /// `model` unless it is blank, otherwise the configured default.
    pub fn resolve_model(&self, model: &str) -> String {
        let model = model.trim();
        if model.is_empty() {
            self.default_model.clone()
        } else {
            model.to_owned()
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
