// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// History folder persistence helpers:
/// yaml conversion for entry/edit metadata, record directory listing, and safe filesystem
/// writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryYaml {
    id: String,
    created_at: String,
    #[serde(default)]
    generation: GenerationYaml,
    #[serde(default)]
    result: ResultYaml,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GenerationYaml {
    #[serde(default)]
    prompt_file: String,
    #[serde(default)]
    input_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    character_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ResultYaml {
    #[serde(default)]
    success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    output_images: Vec<String>,
    #[serde(default, skip_serializing_if = "TokenUsageYaml::is_zero")]
    token_usage: TokenUsageYaml,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct TokenUsageYaml {
    #[serde(default)]
    prompt: u64,
    #[serde(default)]
    candidates: u64,
    #[serde(default)]
    total: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    cached: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    thoughts: u64,
}

impl TokenUsageYaml {
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EditEntryYaml {
    id: String,
    created_at: String,
    source: EditSourceYaml,
    #[serde(default)]
    generation: EditGenerationYaml,
    #[serde(default)]
    result: ResultYaml,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EditSourceYaml {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    edit_id: Option<String>,
    #[serde(default)]
    output: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EditGenerationYaml {
    #[serde(default)]
    prompt_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

// Older metadata writes empty strings for absent optional fields.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn timestamp_to_yaml(created_at: &DateTime<Utc>) -> String {
    created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn timestamp_from_yaml(value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| StoreError::InvalidTimestamp {
            field: "created_at",
            value,
            source,
        })
}

fn result_to_yaml(result: &GenerationResult) -> ResultYaml {
    let usage = result.token_usage;
    ResultYaml {
        success: result.success,
        output_images: result.output_images.clone(),
        token_usage: TokenUsageYaml {
            prompt: usage.prompt,
            candidates: usage.candidates,
            total: usage.total,
            cached: usage.cached,
            thoughts: usage.thoughts,
        },
        error_message: result.error_message.clone(),
    }
}

fn result_from_yaml(result: ResultYaml) -> GenerationResult {
    let usage = result.token_usage;
    GenerationResult {
        success: result.success,
        output_images: result.output_images,
        token_usage: TokenUsage {
            prompt: usage.prompt,
            candidates: usage.candidates,
            total: usage.total,
            cached: usage.cached,
            thoughts: usage.thoughts,
        },
        error_message: non_empty(result.error_message),
    }
}

fn entry_to_yaml(entry: &Entry) -> EntryYaml {
    EntryYaml {
        id: entry.id.to_string(),
        created_at: timestamp_to_yaml(&entry.created_at),
        generation: GenerationYaml {
            prompt_file: entry.generation.prompt_file.clone(),
            input_images: entry.generation.input_images.clone(),
            context_file: entry.generation.context_file.clone(),
            character_file: entry.generation.character_file.clone(),
        },
        result: result_to_yaml(&entry.result),
    }
}

fn entry_from_yaml(entry_yaml: EntryYaml) -> Result<Entry, StoreError> {
    let id = EntryId::new(entry_yaml.id.clone()).map_err(|source| StoreError::InvalidId {
        field: "id",
        value: entry_yaml.id,
        source,
    })?;
    let generation = entry_yaml.generation;

    Ok(Entry {
        id,
        created_at: timestamp_from_yaml(entry_yaml.created_at)?,
        generation: Generation {
            prompt_file: generation.prompt_file,
            input_images: generation.input_images,
            context_file: non_empty(generation.context_file),
            character_file: non_empty(generation.character_file),
        },
        result: result_from_yaml(entry_yaml.result),
    })
}

fn edit_to_yaml(edit: &EditEntry) -> EditEntryYaml {
    EditEntryYaml {
        id: edit.id.to_string(),
        created_at: timestamp_to_yaml(&edit.created_at),
        source: EditSourceYaml {
            kind: edit.source.kind().as_str().to_owned(),
            edit_id: edit.source.edit_id().map(ToString::to_string),
            output: edit.source.output().to_owned(),
        },
        generation: EditGenerationYaml {
            prompt_file: edit.generation.prompt_file.clone(),
            aspect_ratio: edit.generation.aspect_ratio.clone(),
            image_size: edit.generation.image_size.clone(),
        },
        result: result_to_yaml(&edit.result),
    }
}

fn edit_source_from_yaml(
    meta_path: &Path,
    source: EditSourceYaml,
) -> Result<EditSource, StoreError> {
    let kind = source
        .kind
        .parse::<EditSourceKind>()
        .map_err(|err| StoreError::InvalidSource {
            path: meta_path.to_path_buf(),
            reason: err.to_string(),
        })?;

    match (kind, non_empty(source.edit_id)) {
        (EditSourceKind::Generate, None) => Ok(EditSource::Generation {
            output: source.output,
        }),
        (EditSourceKind::Generate, Some(edit_id)) => Err(StoreError::InvalidSource {
            path: meta_path.to_path_buf(),
            reason: format!("source type \"generate\" must not carry edit_id {edit_id:?}"),
        }),
        (EditSourceKind::Edit, Some(raw)) => {
            let edit_id = EditId::new(raw.clone()).map_err(|err| StoreError::InvalidId {
                field: "source.edit_id",
                value: raw,
                source: err,
            })?;
            Ok(EditSource::Edit {
                edit_id,
                output: source.output,
            })
        }
        (EditSourceKind::Edit, None) => Err(StoreError::InvalidSource {
            path: meta_path.to_path_buf(),
            reason: "source type \"edit\" requires edit_id".to_owned(),
        }),
    }
}

fn edit_from_yaml(meta_path: &Path, edit_yaml: EditEntryYaml) -> Result<EditEntry, StoreError> {
    let id = EditId::new(edit_yaml.id.clone()).map_err(|source| StoreError::InvalidId {
        field: "id",
        value: edit_yaml.id,
        source,
    })?;
    let generation = edit_yaml.generation;

    Ok(EditEntry {
        id,
        created_at: timestamp_from_yaml(edit_yaml.created_at)?,
        source: edit_source_from_yaml(meta_path, edit_yaml.source)?,
        generation: EditGeneration {
            prompt_file: generation.prompt_file,
            aspect_ratio: non_empty(generation.aspect_ratio),
            image_size: non_empty(generation.image_size),
        },
        result: result_from_yaml(edit_yaml.result),
    })
}

/// Subdirectories of `dir` whose names parse as record ids. A missing `dir` lists as empty;
/// foreign files and directories are ignored.
fn list_record_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, StoreError> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut out = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let is_dir = dir_entry
            .file_type()
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }
        let Some(name) = dir_entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        if !is_record_id(&name) {
            continue;
        }
        out.push((name, dir_entry.path()));
    }
    Ok(out)
}

/// A record file name is a single plain path segment.
fn validate_file_name(field: &'static str, name: &str) -> Result<(), StoreError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(StoreError::InvalidFileName {
            field,
            value: name.to_owned(),
        }),
    }
}

/// Creates `root` and then each component of `relative` below it, refusing to follow
/// symlinks.
fn create_dir_all_safe(root: &Path, relative: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(root).map_err(|source| StoreError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut current = root.to_path_buf();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            continue;
        };

        current.push(part);

        match fs::symlink_metadata(&current) {
            Ok(md) => {
                if md.file_type().is_symlink() {
                    return Err(StoreError::SymlinkRefused { path: current });
                }
                if !md.is_dir() {
                    return Err(StoreError::Io {
                        path: current,
                        source: io::Error::new(io::ErrorKind::AlreadyExists, "expected directory"),
                    });
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir(&current).map_err(|source| StoreError::Io {
                    path: current.clone(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: current,
                    source,
                })
            }
        }
    }

    Ok(())
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

/// Writes `contents` to a hidden temp file next to `path` and renames it into place, so
/// readers never observe a partially written file. The parent directory must already exist.
fn write_atomic(
    root: &Path,
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    if !path.starts_with(root) {
        return Err(StoreError::InvalidFileName {
            field: "path",
            value: path.display().to_string(),
        });
    }

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(StoreError::InvalidFileName {
            field: "path",
            value: path.display().to_string(),
        });
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".pictrail.tmp.{}.{}",
        file_name.to_string_lossy(),
        nanos
    ));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;

    let written = file.write_all(contents).and_then(|()| {
        if durability == WriteDurability::Durable {
            file.sync_all()
        } else {
            Ok(())
        }
    });
    drop(file);
    if let Err(source) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: tmp_path,
            source,
        });
    }

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
            dir.sync_all().map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    Ok(())
}
