// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pictrail CLI entrypoint.
//!
//! Lists a subproject's generation history, newest first. The project root is found by
//! walking up from the current directory to `pictrail.yaml` unless `--project` is given; the
//! subproject comes from `--subproject` or from the current directory.

use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

use pictrail::config::ServiceConfig;
use pictrail::model::Entry;
use pictrail::paths;
use pictrail::store::RecordStore;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--project <dir>] [--subproject <name>] [--limit <n>] [--edits]\n\nLists history entries newest first.\n--limit keeps only the newest <n> entries.\n--edits also lists each entry's edit chain.\n\nRUST_LOG controls diagnostics on stderr (default `pictrail=info`)."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    project_dir: Option<String>,
    subproject: Option<String>,
    limit: Option<usize>,
    edits: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--project" => {
                if options.project_dir.is_some() {
                    return Err(());
                }
                let dir = args.next().ok_or(())?;
                options.project_dir = Some(dir);
            }
            "--subproject" => {
                if options.subproject.is_some() {
                    return Err(());
                }
                let name = args.next().ok_or(())?;
                if name.is_empty() || name.starts_with('-') {
                    return Err(());
                }
                options.subproject = Some(name);
            }
            "--limit" => {
                if options.limit.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let limit: usize = raw.parse().map_err(|_| ())?;
                options.limit = Some(limit);
            }
            "--edits" => {
                if options.edits {
                    return Err(());
                }
                options.edits = true;
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

/// Renders entries newest first; `limit` keeps the newest `n`.
fn render_history(
    store: &impl RecordStore,
    limit: Option<usize>,
    with_edits: bool,
) -> Result<String, Box<dyn Error>> {
    let mut entries = store.list_entries()?;
    entries.reverse();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    let mut out = String::new();
    if entries.is_empty() {
        out.push_str("no history entries\n");
        return Ok(out);
    }

    for entry in &entries {
        render_entry(&mut out, store, entry, with_edits)?;
    }
    Ok(out)
}

fn render_entry(
    out: &mut String,
    store: &impl RecordStore,
    entry: &Entry,
    with_edits: bool,
) -> Result<(), Box<dyn Error>> {
    let status = if entry.result.success { "ok" } else { "failed" };
    writeln!(
        out,
        "{}  {}  {status}  edits: {}",
        entry.id,
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        store.count_edits(&entry.id)
    )?;
    if let Some(line) = store
        .load_prompt(&entry.id)
        .ok()
        .and_then(|prompt| prompt.lines().next().map(str::to_owned))
    {
        writeln!(out, "  prompt: {line}")?;
    }
    for output in &entry.result.output_images {
        writeln!(out, "  output: {output}")?;
    }
    if let Some(message) = &entry.result.error_message {
        writeln!(out, "  error: {message}")?;
    }

    if with_edits {
        for edit in store.list_edits(&entry.id)? {
            let origin = match edit.source.edit_id() {
                Some(prior) => format!("edit {prior}"),
                None => "generation".to_owned(),
            };
            writeln!(
                out,
                "  edit {}  from {origin} ({})",
                edit.id,
                edit.source.output()
            )?;
            for output in &edit.result.output_images {
                writeln!(out, "    output: {output}")?;
            }
        }
    }
    Ok(())
}

fn run(options: CliOptions) -> Result<String, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    let root = match &options.project_dir {
        Some(dir) => PathBuf::from(dir),
        None => paths::find_project_root(&cwd)?,
    };
    let subproject = match options.subproject {
        Some(name) => name,
        None => match paths::find_current_subproject(&root, &cwd) {
            Ok(name) => name,
            Err(err) => {
                let available = paths::list_subprojects(&root)?;
                if available.is_empty() {
                    return Err(err.into());
                }
                let hint = available.join(", ");
                return Err(format!("{err}; pick one with --subproject: {hint}").into());
            }
        },
    };

    let config = ServiceConfig::from_env();
    let subproject_dir = paths::subproject_dir(&root, &subproject);
    let store = config.history_folder(paths::history_dir(&subproject_dir));
    tracing::debug!(history = %store.root().display(), "listing history");
    render_history(&store, options.limit, options.edits)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pictrail=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "pictrail".to_owned());
    let options = match parse_options(args) {
        Ok(options) => options,
        Err(()) => {
            print_usage(&program);
            std::process::exit(2);
        }
    };

    match run(options) {
        Ok(listing) => print!("{listing}"),
        Err(err) => {
            eprintln!("{program}: {err}");
            std::process::exit(1);
        }
    }
}
