// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{GenerateParams, GenerateResponse, GeneratedImage, Generator, GeneratorError};
use crate::model::TokenUsage;

#[derive(Debug, Clone)]
enum Behavior {
    Respond(GenerateResponse),
    Fail(String),
    Hang,
}

/// In-memory [`Generator`] that records every call and answers with canned data.
///
/// Like a real client it fails with [`GeneratorError::Input`] when an input image is missing.
#[derive(Debug)]
pub struct FakeGenerator {
    behavior: Behavior,
    calls: Mutex<Vec<GenerateParams>>,
}

impl FakeGenerator {
    /// Answers every call with `count` copies of `data` as PNG images.
    pub fn with_images(data: &[u8], count: usize) -> Self {
        let images = (0..count)
            .map(|_| GeneratedImage::new("image/png", data.to_vec()))
            .collect();
        Self::with_response(GenerateResponse {
            images,
            text: None,
            token_usage: TokenUsage {
                prompt: 100,
                candidates: 50 * count as u64,
                total: 100 + 50 * count as u64,
                ..TokenUsage::default()
            },
        })
    }

    pub fn with_response(response: GenerateResponse) -> Self {
        Self {
            behavior: Behavior::Respond(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with a provider error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Never completes; pair with a cancellation token.
    pub fn hanging() -> Self {
        Self {
            behavior: Behavior::Hang,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    pub fn calls(&self) -> Vec<GenerateParams> {
        self.lock_calls().clone()
    }

    pub fn last_call(&self) -> Option<GenerateParams> {
        self.lock_calls().last().cloned()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<GenerateParams>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, params: GenerateParams) -> Result<GenerateResponse, GeneratorError> {
        self.lock_calls().push(params.clone());
        for path in &params.image_paths {
            if let Err(source) = std::fs::metadata(path) {
                return Err(GeneratorError::Input {
                    path: path.clone(),
                    source,
                });
            }
        }
        match &self.behavior {
            Behavior::Respond(response) => Ok(response.clone()),
            Behavior::Fail(message) => Err(GeneratorError::provider(message.clone())),
            Behavior::Hang => std::future::pending().await,
        }
    }
}
