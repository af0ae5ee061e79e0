// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pre-flight checks for generation and edit requests.
//!
//! Everything here runs before the service touches the history folder or calls the
//! generator. The only I/O is probing whether input files exist.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::generation::{EditSpec, Spec};

/// Output sizes the provider accepts. Matching is case-sensitive.
pub const VALID_IMAGE_SIZES: [&str; 3] = ["1K", "2K", "4K"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("invalid aspect ratio {value:?}: must be in N:N format (e.g. 1:1, 16:9)")]
    InvalidAspectRatio { value: String },
    #[error("invalid image size {value:?}: must be 1K, 2K, or 4K")]
    InvalidImageSize { value: String },
    #[error("no input images specified")]
    NoInputImages,
    #[error("{}", describe_missing(.paths))]
    MissingInputImages { paths: Vec<PathBuf> },
    #[error("edit source image not found: {}", .path.display())]
    MissingSourceImage { path: PathBuf },
    #[error("edit source output name must not be empty")]
    EmptySourceOutput,
}

fn describe_missing(paths: &[PathBuf]) -> String {
    match paths {
        [single] => format!("input image not found: {}", single.display()),
        _ => {
            let joined = paths
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("input images not found: {joined}")
        }
    }
}

fn aspect_ratio_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+:\d+$").expect("aspect ratio pattern is valid"))
}

/// Empty means "provider default" and always passes.
pub fn validate_aspect_ratio(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || aspect_ratio_pattern().is_match(value) {
        return Ok(());
    }
    Err(ValidationError::InvalidAspectRatio {
        value: value.to_owned(),
    })
}

/// Empty means "provider default" and always passes.
pub fn validate_image_size(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || VALID_IMAGE_SIZES.contains(&value) {
        return Ok(());
    }
    Err(ValidationError::InvalidImageSize {
        value: value.to_owned(),
    })
}

pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }
    Ok(())
}

/// Reports every missing path at once. An empty list passes.
pub fn validate_input_images<P: AsRef<Path>>(paths: &[P]) -> Result<(), ValidationError> {
    let missing = paths
        .iter()
        .map(|path| path.as_ref())
        .filter(|path| is_missing(path))
        .map(Path::to_path_buf)
        .collect::<Vec<_>>();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingInputImages { paths: missing })
    }
}

pub fn validate_spec(spec: &Spec) -> Result<(), ValidationError> {
    validate_prompt(&spec.prompt)?;
    validate_aspect_ratio(spec.aspect_ratio.as_deref().unwrap_or(""))?;
    validate_image_size(spec.image_size.as_deref().unwrap_or(""))?;
    if spec.image_paths.is_empty() {
        return Err(ValidationError::NoInputImages);
    }
    validate_input_images(&spec.image_paths)
}

pub fn validate_edit_spec(spec: &EditSpec) -> Result<(), ValidationError> {
    validate_prompt(&spec.prompt)?;
    validate_aspect_ratio(spec.aspect_ratio.as_deref().unwrap_or(""))?;
    validate_image_size(spec.image_size.as_deref().unwrap_or(""))?;
    if is_missing(&spec.source_image_path) {
        return Err(ValidationError::MissingSourceImage {
            path: spec.source_image_path.clone(),
        });
    }
    if spec.source.output().is_empty() {
        return Err(ValidationError::EmptySourceOutput);
    }
    Ok(())
}

// Only a definite "not found" counts as missing; permission errors surface later when the
// file is actually read.
fn is_missing(path: &Path) -> bool {
    matches!(fs::metadata(path), Err(err) if err.kind() == io::ErrorKind::NotFound)
}
