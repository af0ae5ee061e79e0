// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pictrail and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{HistoryFolder, StoreError, WriteDurability};
use crate::generator::GeneratedImage;
use crate::model::fixtures::{edit_of_edit, edit_of_generation, entry_full, entry_minimal};
use crate::model::{EditId, Entry, EntryId, TokenUsage};
use crate::store::{RecordLocation, RecordStore};

struct Ctx {
    dir: TempDir,
    store: HistoryFolder,
}

impl Ctx {
    fn write_source(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }
}

#[fixture]
fn ctx() -> Ctx {
    let dir = TempDir::new().unwrap();
    let store = HistoryFolder::new(dir.path().join("history"));
    Ctx { dir, store }
}

fn read_yaml(path: &Path) -> serde_yaml::Value {
    serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn saved(store: &HistoryFolder, entry: &Entry) {
    store.save_entry(entry).unwrap();
}

#[rstest]
#[case::full(entry_full())]
#[case::minimal(entry_minimal())]
fn entry_round_trips(ctx: Ctx, #[case] entry: Entry) {
    saved(&ctx.store, &entry);
    assert_eq!(ctx.store.entry_by_id(&entry.id).unwrap(), entry);
}

#[rstest]
fn durable_writes_round_trip(ctx: Ctx) {
    let store = ctx.store.clone().with_durability(WriteDurability::Durable);
    let entry = entry_full();
    store.save_entry(&entry).unwrap();
    assert_eq!(store.entry_by_id(&entry.id).unwrap(), entry);
}

#[rstest]
fn meta_yaml_uses_documented_keys(ctx: Ctx) {
    let entry = entry_full();
    saved(&ctx.store, &entry);

    let yaml = read_yaml(&ctx.store.entry_meta_path(&entry.id));
    assert_eq!(yaml["id"].as_str(), Some(entry.id.as_str()));
    let created_at = yaml["created_at"].as_str().unwrap();
    assert!(created_at.ends_with('Z'), "{created_at}");
    assert!(!created_at.contains('.'), "{created_at}");
    assert_eq!(yaml["generation"]["prompt_file"].as_str(), Some("prompt.txt"));
    assert_eq!(yaml["generation"]["context_file"].as_str(), Some("context.md"));
    assert_eq!(yaml["result"]["success"].as_bool(), Some(true));
    assert_eq!(yaml["result"]["token_usage"]["cached"].as_u64(), Some(12));
    assert_eq!(yaml["result"]["token_usage"]["thoughts"].as_u64(), Some(7));
}

#[rstest]
fn meta_yaml_omits_zero_value_optionals(ctx: Ctx) {
    let mut entry = entry_minimal();
    entry.result.mark_succeeded(
        vec!["output-a-1.png".to_owned()],
        TokenUsage {
            prompt: 10,
            candidates: 5,
            total: 15,
            ..TokenUsage::default()
        },
    );
    saved(&ctx.store, &entry);

    let yaml = read_yaml(&ctx.store.entry_meta_path(&entry.id));
    let generation = yaml["generation"].as_mapping().unwrap();
    assert!(!generation.contains_key("context_file"));
    assert!(!generation.contains_key("character_file"));
    let result = yaml["result"].as_mapping().unwrap();
    assert!(!result.contains_key("error_message"));
    let usage = yaml["result"]["token_usage"].as_mapping().unwrap();
    assert!(!usage.contains_key("cached"));
    assert!(!usage.contains_key("thoughts"));
    assert_eq!(ctx.store.entry_by_id(&entry.id).unwrap(), entry);
}

#[rstest]
fn reads_metadata_written_with_empty_optionals(ctx: Ctx) {
    let id = EntryId::generate();
    let dir = ctx.store.entry_dir(&id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("meta.yaml"),
        format!(
            "id: {id}\ncreated_at: 2025-01-02T03:04:05Z\ngeneration:\n  prompt_file: prompt.txt\n  \
             input_images: [a.png]\n  context_file: \"\"\n  character_file: \"\"\nresult:\n  \
             success: false\n  error_message: \"\"\n"
        ),
    )
    .unwrap();

    let entry = ctx.store.entry_by_id(&id).unwrap();
    assert_eq!(entry.generation.context_file, None);
    assert_eq!(entry.generation.character_file, None);
    assert_eq!(entry.result.error_message, None);
    assert_eq!(entry.created_at.to_rfc3339(), "2025-01-02T03:04:05+00:00");
}

#[rstest]
fn save_entry_overwrites_previous_metadata(ctx: Ctx) {
    let mut entry = entry_minimal();
    saved(&ctx.store, &entry);
    entry.result.mark_failed("provider down");
    saved(&ctx.store, &entry);

    assert_eq!(ctx.store.entry_by_id(&entry.id).unwrap(), entry);
    let names: Vec<_> = fs::read_dir(ctx.store.entry_dir(&entry.id))
        .unwrap()
        .map(|dir_entry| dir_entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec!["meta.yaml"]);
}

#[rstest]
fn list_entries_on_missing_history_is_empty(ctx: Ctx) {
    assert!(ctx.store.list_entries().unwrap().is_empty());
    assert!(matches!(
        ctx.store.latest_entry(),
        Err(StoreError::NoEntries)
    ));
}

#[rstest]
fn list_entries_sorts_by_id_and_skips_incomplete(ctx: Ctx) {
    let first = entry_minimal();
    let second = entry_full();
    let third = entry_minimal();
    // Saved out of order on purpose.
    saved(&ctx.store, &third);
    saved(&ctx.store, &first);
    saved(&ctx.store, &second);

    // In-flight: directory without metadata.
    let in_flight = EntryId::generate();
    ctx.store
        .create_record(&RecordLocation::entry(&in_flight))
        .unwrap();
    // Corrupt metadata.
    let corrupt = EntryId::generate();
    fs::create_dir_all(ctx.store.entry_dir(&corrupt)).unwrap();
    fs::write(ctx.store.entry_meta_path(&corrupt), "id: [unterminated").unwrap();
    // Foreign names.
    fs::create_dir_all(ctx.store.root().join("not-an-id")).unwrap();
    fs::write(ctx.store.root().join("notes.txt"), "hello").unwrap();

    let listed: Vec<EntryId> = ctx
        .store
        .list_entries()
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    assert_eq!(listed, vec![first.id, second.id, third.id.clone()]);
    assert_eq!(ctx.store.latest_entry().unwrap().id, third.id);
}

#[rstest]
fn list_entries_skips_metadata_for_another_id(ctx: Ctx) {
    let entry = entry_minimal();
    saved(&ctx.store, &entry);
    let other = EntryId::generate();
    fs::create_dir_all(ctx.store.entry_dir(&other)).unwrap();
    fs::copy(
        ctx.store.entry_meta_path(&entry.id),
        ctx.store.entry_meta_path(&other),
    )
    .unwrap();

    let listed = ctx.store.list_entries().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, entry.id);
}

#[rstest]
fn list_entries_skips_non_canonical_directory_names(ctx: Ctx) {
    let entry = entry_minimal();
    saved(&ctx.store, &entry);
    let braced = ctx.store.root().join(format!("{{{}}}", entry.id));
    fs::create_dir_all(&braced).unwrap();
    fs::copy(ctx.store.entry_meta_path(&entry.id), braced.join("meta.yaml")).unwrap();

    let listed = ctx.store.list_entries().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, entry.id);
}

#[rstest]
fn unknown_entry_is_not_found(ctx: Ctx) {
    let err = ctx.store.entry_by_id(&EntryId::generate()).unwrap_err();
    assert!(matches!(err, StoreError::EntryNotFound { .. }));
    assert!(err.is_not_found());
}

#[rstest]
fn corrupt_entry_is_a_yaml_error(ctx: Ctx) {
    let id = EntryId::generate();
    fs::create_dir_all(ctx.store.entry_dir(&id)).unwrap();
    fs::write(ctx.store.entry_meta_path(&id), "id: [unterminated").unwrap();

    let err = ctx.store.entry_by_id(&id).unwrap_err();
    assert!(matches!(err, StoreError::Yaml { .. }), "{err}");
    assert!(!err.is_not_found());
}

#[rstest]
fn cleanup_entry_removes_everything_and_tolerates_missing(ctx: Ctx) {
    let entry = entry_full();
    saved(&ctx.store, &entry);
    let edit = edit_of_generation("output-0190-1.png");
    ctx.store.save_edit(&entry.id, &edit).unwrap();

    ctx.store.cleanup_entry(&entry.id).unwrap();
    assert!(!ctx.store.entry_dir(&entry.id).exists());
    ctx.store.cleanup_entry(&entry.id).unwrap();
    ctx.store.cleanup_entry(&EntryId::generate()).unwrap();
}

#[rstest]
fn edits_round_trip_and_chain(ctx: Ctx) {
    let entry = entry_full();
    saved(&ctx.store, &entry);
    let first = edit_of_generation("output-0190-1.png");
    let second = edit_of_edit(&first);
    ctx.store.save_edit(&entry.id, &second).unwrap();
    ctx.store.save_edit(&entry.id, &first).unwrap();

    assert_eq!(ctx.store.edit_by_id(&entry.id, &first.id).unwrap(), first);
    assert_eq!(ctx.store.edit_by_id(&entry.id, &second.id).unwrap(), second);
    assert_eq!(
        ctx.store.list_edits(&entry.id).unwrap(),
        vec![first.clone(), second.clone()]
    );
    assert_eq!(ctx.store.latest_edit(&entry.id).unwrap(), second);
    assert_eq!(ctx.store.count_edits(&entry.id), 2);

    let yaml = read_yaml(&ctx.store.edit_meta_path(&entry.id, &first.id));
    assert_eq!(yaml["source"]["type"].as_str(), Some("generate"));
    assert!(!yaml["source"].as_mapping().unwrap().contains_key("edit_id"));
    let yaml = read_yaml(&ctx.store.edit_meta_path(&entry.id, &second.id));
    assert_eq!(yaml["source"]["type"].as_str(), Some("edit"));
    assert_eq!(yaml["source"]["edit_id"].as_str(), Some(first.id.as_str()));
    assert_eq!(yaml["generation"]["image_size"].as_str(), Some("2K"));
}

#[rstest]
fn edits_of_unknown_entry(ctx: Ctx) {
    let entry_id = EntryId::generate();
    assert!(ctx.store.list_edits(&entry_id).unwrap().is_empty());
    assert_eq!(ctx.store.count_edits(&entry_id), 0);
    assert!(matches!(
        ctx.store.latest_edit(&entry_id),
        Err(StoreError::NoEdits { .. })
    ));
    let err = ctx
        .store
        .edit_by_id(&entry_id, &EditId::generate())
        .unwrap_err();
    assert!(matches!(err, StoreError::EditNotFound { .. }));
}

#[rstest]
fn cleanup_edit_keeps_siblings(ctx: Ctx) {
    let entry = entry_full();
    saved(&ctx.store, &entry);
    let first = edit_of_generation("output-0190-1.png");
    let second = edit_of_edit(&first);
    ctx.store.save_edit(&entry.id, &first).unwrap();
    ctx.store.save_edit(&entry.id, &second).unwrap();

    ctx.store.cleanup_edit(&entry.id, &second.id).unwrap();

    assert_eq!(ctx.store.list_edits(&entry.id).unwrap(), vec![first]);
    assert_eq!(ctx.store.entry_by_id(&entry.id).unwrap(), entry);
}

#[rstest]
#[case::generate_with_edit_id(format!(
    "  type: generate\n  edit_id: {}\n  output: a.png\n",
    EditId::generate()
))]
#[case::edit_without_edit_id("  type: edit\n  output: a.png\n".to_owned())]
#[case::unknown_type("  type: remix\n  output: a.png\n".to_owned())]
fn inconsistent_edit_source_is_rejected(ctx: Ctx, #[case] source: String) {
    let entry = entry_minimal();
    saved(&ctx.store, &entry);
    let edit_id = EditId::generate();
    fs::create_dir_all(ctx.store.edit_dir(&entry.id, &edit_id)).unwrap();
    fs::write(
        ctx.store.edit_meta_path(&entry.id, &edit_id),
        format!("id: {edit_id}\ncreated_at: 2025-01-02T03:04:05Z\nsource:\n{source}"),
    )
    .unwrap();

    let err = ctx.store.edit_by_id(&entry.id, &edit_id).unwrap_err();
    assert!(matches!(err, StoreError::InvalidSource { .. }), "{err}");
    assert!(ctx.store.list_edits(&entry.id).unwrap().is_empty());
}

#[rstest]
fn prompts_read_back(ctx: Ctx) {
    let entry = entry_minimal();
    let edit = edit_of_generation("output-0190-1.png");
    ctx.store.save_prompt(&entry.id, "a red ball\n").unwrap();
    ctx.store
        .save_edit_prompt(&entry.id, &edit.id, "make it blue")
        .unwrap();

    assert_eq!(ctx.store.load_prompt(&entry.id).unwrap(), "a red ball\n");
    assert_eq!(
        ctx.store.load_edit_prompt(&entry.id, &edit.id).unwrap(),
        "make it blue"
    );
}

#[rstest]
fn save_input_images_copies_what_it_can(ctx: Ctx) {
    let entry = entry_minimal();
    let present = ctx.write_source("front.png", b"front");
    let missing = ctx.dir.path().join("side.png");
    let also_present = ctx.write_source("back.png", b"back");

    let err = ctx
        .store
        .save_input_images(&entry.id, &[present, missing.clone(), also_present])
        .unwrap_err();

    assert!(matches!(err, StoreError::Io { ref path, .. } if *path == missing));
    let dir = ctx.store.entry_dir(&entry.id);
    assert_eq!(fs::read(dir.join("front.png")).unwrap(), b"front");
    assert_eq!(fs::read(dir.join("back.png")).unwrap(), b"back");
}

#[rstest]
fn context_and_character_snapshots(ctx: Ctx) {
    let entry = entry_minimal();
    let context = ctx.write_source("world.md", b"# World");
    let character = ctx.write_source("hero.md", b"# Hero");

    ctx.store.save_context_file(&entry.id, &context).unwrap();
    ctx.store.save_character_file(&entry.id, &character).unwrap();

    let dir = ctx.store.entry_dir(&entry.id);
    assert_eq!(fs::read(dir.join("context.md")).unwrap(), b"# World");
    assert_eq!(fs::read(dir.join("character.md")).unwrap(), b"# Hero");
}

#[rstest]
fn output_images_are_numbered_per_run(ctx: Ctx) {
    let entry_id = EntryId::generate();
    let at = RecordLocation::entry(&entry_id);
    let images = [
        GeneratedImage::new("image/png", b"one".to_vec()),
        GeneratedImage::new("image/jpeg", Vec::new()),
        GeneratedImage::new("image/webp", b"three".to_vec()),
    ];

    let names = ctx.store.save_output_images(&at, &images).unwrap();

    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("output-") && names[0].ends_with("-1.png"));
    assert!(names[1].ends_with("-2.webp"));
    let run_of = |name: &str| name.rsplit_once('-').map(|(run, _)| run.to_owned());
    assert_eq!(run_of(&names[0]), run_of(&names[1]));
    let dir = ctx.store.entry_dir(&entry_id);
    assert_eq!(fs::read(dir.join(&names[1])).unwrap(), b"three");
}

#[rstest]
fn output_images_require_data(ctx: Ctx) {
    let at = RecordLocation::entry(&EntryId::generate());
    let err = ctx
        .store
        .save_output_images(&at, &[GeneratedImage::new("image/png", Vec::new())])
        .unwrap_err();
    assert!(matches!(err, StoreError::NoImages));
    let err = ctx.store.save_output_images(&at, &[]).unwrap_err();
    assert!(matches!(err, StoreError::NoImages));
}

#[rstest]
#[case("")]
#[case("../escape.txt")]
#[case("nested/file.txt")]
#[case("..")]
fn put_file_rejects_path_like_names(ctx: Ctx, #[case] name: &str) {
    let at = RecordLocation::entry(&EntryId::generate());
    let err = ctx.store.put_file(&at, name, b"x").unwrap_err();
    assert!(matches!(err, StoreError::InvalidFileName { .. }), "{err}");
}

#[cfg(unix)]
#[rstest]
fn refuses_to_write_through_symlinked_record(ctx: Ctx) {
    let entry = entry_minimal();
    let outside = ctx.dir.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    fs::create_dir_all(ctx.store.root()).unwrap();
    std::os::unix::fs::symlink(&outside, ctx.store.entry_dir(&entry.id)).unwrap();

    let err = ctx.store.save_entry(&entry).unwrap_err();
    assert!(matches!(err, StoreError::SymlinkRefused { .. }), "{err}");
    assert!(fs::read_dir(&outside).unwrap().next().is_none());
}
