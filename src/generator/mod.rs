// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The image-generation capability the service depends on.
//!
//! The provider client lives outside this crate; anything that can turn a prompt plus input
//! images into image bytes implements [`Generator`]. [`fake::FakeGenerator`] is an in-memory
//! implementation for tests and benchmarks.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::model::TokenUsage;

pub mod fake;

/// Request forwarded to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateParams {
    pub model: String,
    pub prompt: String,
    pub image_paths: Vec<PathBuf>,
    pub aspect_ratio: Option<String>,
    pub image_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl GeneratedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// File extension (with leading dot) used when this image is written to disk.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub images: Vec<GeneratedImage>,
    /// Any text the provider returned alongside the images.
    pub text: Option<String>,
    pub token_usage: TokenUsage,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("generation was cancelled")]
    Cancelled,
    #[error("failed to read input image {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{message}")]
    Provider { message: String },
}

impl GeneratorError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

/// Performs one generation call. Retries, timeouts and authentication belong to the
/// implementor.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, params: GenerateParams) -> Result<GenerateResponse, GeneratorError>;
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    match mime_type.as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/avif" => ".avif",
        "image/heic" => ".heic",
        "image/heif" => ".heif",
        "image/tiff" | "image/tif" => ".tiff",
        other if other.contains("jpeg") => ".jpg",
        _ => ".bin",
    }
}
