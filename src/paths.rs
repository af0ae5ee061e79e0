// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Project layout: locating the project root and mapping subprojects to their directories.
//!
//! ```text
//! <project>/pictrail.yaml
//! <project>/characters/<name>.md
//! <project>/subprojects/<name>/config.yaml
//! <project>/subprojects/<name>/inputs/
//! <project>/subprojects/<name>/history/
//! ```

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

pub const PROJECT_MARKER: &str = "pictrail.yaml";
pub const SUBPROJECT_CONFIG: &str = "config.yaml";

const SUBPROJECTS_DIRNAME: &str = "subprojects";
const CHARACTERS_DIRNAME: &str = "characters";
const INPUTS_DIRNAME: &str = "inputs";
const HISTORY_DIRNAME: &str = "history";

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("project not found (no pictrail.yaml in {start:?} or its parents)")]
    ProjectNotFound { start: PathBuf },
    #[error("{cwd:?} is not inside a subproject of {root:?}")]
    NotInSubproject { root: PathBuf, cwd: PathBuf },
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Walks up from `start` to the first directory holding a `pictrail.yaml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, PathError> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_MARKER).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| PathError::ProjectNotFound {
            start: start.to_path_buf(),
        })
}

/// Name of the subproject containing `cwd`, which must be at or below
/// `subprojects/<name>/` of `root` with that subproject's `config.yaml` present.
pub fn find_current_subproject(root: &Path, cwd: &Path) -> Result<String, PathError> {
    let not_in_subproject = || PathError::NotInSubproject {
        root: root.to_path_buf(),
        cwd: cwd.to_path_buf(),
    };

    let relative = cwd.strip_prefix(root).map_err(|_| not_in_subproject())?;
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(first)), Some(Component::Normal(name)))
            if first == SUBPROJECTS_DIRNAME =>
        {
            let name = name.to_str().ok_or_else(not_in_subproject)?;
            if subproject_config_path(root, name).is_file() {
                Ok(name.to_owned())
            } else {
                Err(not_in_subproject())
            }
        }
        _ => Err(not_in_subproject()),
    }
}

/// Subprojects that have a `config.yaml`, sorted by name. A missing `subprojects/` lists as
/// empty.
pub fn list_subprojects(root: &Path) -> Result<Vec<String>, PathError> {
    let dir = subprojects_dir(root);
    let read_dir = match fs::read_dir(&dir) {
        Ok(read_dir) => read_dir,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(PathError::Io { path: dir, source }),
    };

    let mut names = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(|source| PathError::Io {
            path: dir.clone(),
            source,
        })?;
        let Ok(name) = dir_entry.file_name().into_string() else {
            continue;
        };
        if dir_entry.path().join(SUBPROJECT_CONFIG).is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

pub fn subprojects_dir(root: &Path) -> PathBuf {
    root.join(SUBPROJECTS_DIRNAME)
}

pub fn subproject_dir(root: &Path, name: &str) -> PathBuf {
    subprojects_dir(root).join(name)
}

pub fn subproject_config_path(root: &Path, name: &str) -> PathBuf {
    subproject_dir(root, name).join(SUBPROJECT_CONFIG)
}

pub fn history_dir(subproject_dir: &Path) -> PathBuf {
    subproject_dir.join(HISTORY_DIRNAME)
}

pub fn inputs_dir(subproject_dir: &Path) -> PathBuf {
    subproject_dir.join(INPUTS_DIRNAME)
}

pub fn characters_dir(root: &Path) -> PathBuf {
    root.join(CHARACTERS_DIRNAME)
}

pub fn character_path(root: &Path, character_file: &str) -> PathBuf {
    characters_dir(root).join(character_file)
}
