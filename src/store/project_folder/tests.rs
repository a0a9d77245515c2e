// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};

use super::{
    rename_dir_with_fallback, rename_dir_with_fallback_using, tile_file_stem,
    validate_relative_path, LoadError, ProjectFolder, SaveError, StoreError, WriteDurability,
    MANIFEST_FILENAME,
};
use crate::model::fixtures::small_story;
use crate::model::{MetaInt, Project, Tile, TileVariant};
use crate::store::{recover, RecoverySource};

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = env::temp_dir();
        path.push(format!(
            "storyalign-{prefix}-{}-{nanos}-{counter}",
            std::process::id()
        ));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

struct ProjectFolderTestCtx {
    tmp: TempDir,
    root: PathBuf,
    folder: ProjectFolder,
}

impl ProjectFolderTestCtx {
    fn new(prefix: &str) -> Self {
        let tmp = TempDir::new(prefix);
        let root = tmp.path().join("story");
        let folder = ProjectFolder::new(&root);
        Self { tmp, root, folder }
    }
}

#[fixture]
fn ctx() -> ProjectFolderTestCtx {
    ProjectFolderTestCtx::new("project-folder")
}

/// A saved project of `count` settings, for load-fallback scenarios.
fn saved_settings(ctx: &ProjectFolderTestCtx, count: usize) -> Project {
    let mut project = Project::new();
    project.meta_mut().name = Some("Atlas".to_owned());
    for index in 0..count {
        project.create_tile(TileVariant::Setting, format!("Place {index}"));
    }
    ctx.folder.save(&mut project).unwrap();
    project
}

fn edit_manifest(dir: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
    let path = dir.join(MANIFEST_FILENAME);
    let mut manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    edit(&mut manifest);
    fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
}

/// `project` with a `last_modified` later than any real save.
fn newer_copy(project: &Project) -> Project {
    let mut newer = project.clone();
    newer.meta_mut().last_modified = Some("2999-01-01T00:00:00+00:00".to_owned());
    newer
}

fn move_tile_files(ctx: &ProjectFolderTestCtx, project: &Project, count: usize) {
    let elsewhere = ctx.root.join("Elsewhere");
    fs::create_dir_all(&elsewhere).unwrap();
    for (tile_id, tile) in project.tiles().iter().take(count) {
        let from = ctx.folder.tile_path(tile_id, tile.variant());
        fs::rename(&from, elsewhere.join(format!("{tile_id}.json"))).unwrap();
    }
}

#[rstest]
fn save_then_load_round_trips_the_project(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();

    let report = ctx.folder.save(&mut project).unwrap();
    assert_eq!(report.version, 1);
    assert_eq!(project.meta().version, MetaInt::Value(1));
    assert!(ctx.folder.manifest_path().is_file());
    assert!(ctx.root.join("Tiles/PlotMaps/pm_000001.json").is_file());
    assert!(ctx.root.join("Tiles/Characters/ch_000001.json").is_file());

    let loaded = ctx.folder.load(true).unwrap();
    assert!(loaded.report.manifest_used);
    assert!(!loaded.report.fallback_used);
    assert!(loaded.report.errors.is_empty(), "{:?}", loaded.report.errors);
    assert!(loaded.integrity.is_clean(), "{}", loaded.integrity);
    assert_eq!(loaded.project, project);

    let map = loaded.project.tile(&ids.map).unwrap();
    assert_eq!(
        map.as_plot_map().unwrap().plot_points(),
        &[ids.p1.clone(), ids.p2.clone()]
    );

    let second = ctx.folder.save(&mut project).unwrap();
    assert_eq!(second.version, 2);
    assert!(!ctx.folder.temp_dir().exists());
    assert!(!ctx.folder.backup_dir().exists());
}

#[rstest]
fn manifest_uses_forward_slash_paths(ctx: ProjectFolderTestCtx) {
    let (mut project, _) = small_story();
    ctx.folder.save(&mut project).unwrap();

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(ctx.folder.manifest_path()).unwrap()).unwrap();
    assert_eq!(manifest["tile_count"], 5);
    assert_eq!(manifest["schema_version"], 1);
    assert_eq!(manifest["project_tags"][0], "draft");

    let tiles = manifest["tiles"].as_array().unwrap();
    assert!(tiles
        .iter()
        .any(|entry| entry["filepath"] == "Tiles/Settings/st_000001.json"
            && entry["variant"] == "Setting"));
}

#[rstest]
fn newer_leftover_temp_is_adopted_and_cleaned_up(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();

    let mut newer = project.clone();
    newer.meta_mut().last_modified = Some("2999-01-01T00:00:00+00:00".to_owned());
    newer.tile_mut(&ids.city).unwrap().set_name("Port Vell Reborn");
    ctx.folder
        .write_snapshot(&ctx.folder.temp_dir(), &newer, 2)
        .unwrap();
    assert!(ctx.folder.has_leftovers());

    let report = ctx.folder.save(&mut project).unwrap();
    assert_eq!(report.recovered_from, Some(RecoverySource::Temp));
    assert!(report.adopted_recovered);
    assert_eq!(report.version, 3);
    assert_eq!(project.tile(&ids.city).unwrap().name(), "Port Vell Reborn");
    assert!(!ctx.folder.temp_dir().exists());
    assert!(!ctx.folder.backup_dir().exists());

    let loaded = ctx.folder.load(true).unwrap();
    assert_eq!(
        loaded.project.tile(&ids.city).unwrap().name(),
        "Port Vell Reborn"
    );
}

#[rstest]
fn stale_backup_is_not_adopted(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();

    let mut older = project.clone();
    older.tile_mut(&ids.city).unwrap().set_name("Old Port");
    older.meta_mut().created_at = Some("1999-01-01T00:00:00+00:00".to_owned());
    older.meta_mut().last_modified = Some("2000-01-01T00:00:00+00:00".to_owned());
    ctx.folder
        .write_snapshot(&ctx.folder.backup_dir(), &older, 1)
        .unwrap();

    let report = ctx.folder.save(&mut project).unwrap();
    assert_eq!(report.recovered_from, Some(RecoverySource::Root));
    assert!(!report.adopted_recovered);
    assert_eq!(project.tile(&ids.city).unwrap().name(), "Port Vell");
    assert!(!ctx.folder.backup_dir().exists());
}

#[rstest]
fn integrity_errors_abort_save_without_touching_disk(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();
    let manifest_before = fs::read_to_string(ctx.folder.manifest_path()).unwrap();
    let modified_before = project.meta().last_modified.clone();

    if let Some(fields) = project
        .tile_mut(&ids.p1)
        .and_then(Tile::as_plot_event_mut)
    {
        fields.timeline_index = Some(-1);
    }

    let err = ctx.folder.save(&mut project).unwrap_err();
    assert!(matches!(err, SaveError::Integrity(ref report) if report.has_errors()));
    assert_eq!(
        fs::read_to_string(ctx.folder.manifest_path()).unwrap(),
        manifest_before
    );
    assert_eq!(project.meta().last_modified, modified_before);
    assert_eq!(project.meta().version, MetaInt::Value(1));
    assert!(!ctx.folder.temp_dir().exists());
}

#[rstest]
fn files_moved_within_tolerance_are_recovered(ctx: ProjectFolderTestCtx) {
    let project = saved_settings(&ctx, 10);
    move_tile_files(&ctx, &project, 2);

    let loaded = ctx.folder.load(false).unwrap();
    assert_eq!(loaded.project.tile_count(), 10);
    assert!(loaded.report.errors.is_empty(), "{:?}", loaded.report.errors);
    assert!(loaded.report.fallback_used);
    assert_eq!(loaded.report.loaded_from_manifest.len(), 8);
    assert_eq!(loaded.report.missing_from_manifest.len(), 2);
    assert_eq!(loaded.report.recovered.len(), 2);
    assert!(loaded.report.loaded_from_fallback.is_empty());
}

#[rstest]
fn supplementary_scan_reports_only_unlisted_tiles(ctx: ProjectFolderTestCtx) {
    let project = saved_settings(&ctx, 10);
    move_tile_files(&ctx, &project, 1);
    fs::write(
        ctx.root.join("Elsewhere/st_extra.json"),
        r#"{"id": "st_extra", "variant": "Setting", "name": "Annex"}"#,
    )
    .unwrap();

    let loaded = ctx.folder.load(false).unwrap();
    assert_eq!(loaded.project.tile_count(), 11);
    assert_eq!(loaded.report.loaded_from_manifest.len(), 9);
    assert_eq!(loaded.report.recovered.len(), 1);
    assert_eq!(
        loaded.report.loaded_from_fallback,
        vec![crate::model::fixtures::tid("st_extra")]
    );
}

#[rstest]
fn too_many_missing_files_fall_back_to_a_full_scan(ctx: ProjectFolderTestCtx) {
    let project = saved_settings(&ctx, 10);
    move_tile_files(&ctx, &project, 4);

    let loaded = ctx.folder.load(false).unwrap();
    assert_eq!(loaded.project.tile_count(), 10);
    assert!(loaded.report.fallback_used);
    assert!(loaded.report.recovered.is_empty());
    assert_eq!(loaded.report.loaded_from_fallback.len(), 10);
    assert!(loaded.report.errors.is_empty(), "{:?}", loaded.report.errors);
    assert_eq!(loaded.project.meta().name.as_deref(), Some("Atlas"));
}

#[rstest]
fn missing_manifest_loads_by_scan_with_default_metadata(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();
    fs::remove_file(ctx.folder.manifest_path()).unwrap();

    let loaded = ctx.folder.load(false).unwrap();
    assert!(!loaded.report.manifest_used);
    assert!(loaded.report.fallback_used);
    assert_eq!(loaded.project.tile_count(), 5);
    assert_eq!(loaded.report.loaded_from_fallback.len(), 5);
    assert_eq!(
        loaded.report.defaulted_metadata,
        crate::store::codec::META_FIELDS.to_vec()
    );
    assert_eq!(
        loaded.project.meta().name.as_deref(),
        Some(crate::model::DEFAULT_PROJECT_NAME)
    );
    assert_eq!(
        loaded.project.tile(&ids.hero).unwrap().resolved_links(),
        &[ids.city.clone()]
    );
}

#[rstest]
fn deleted_tile_is_a_count_mismatch(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();
    fs::remove_file(ctx.folder.tile_path(&ids.city, TileVariant::Setting)).unwrap();

    let loaded = ctx.folder.load(false).unwrap();
    assert_eq!(loaded.project.tile_count(), 4);
    assert!(loaded
        .report
        .errors
        .contains(&"Manifest expected 5 tiles but loaded 4".to_owned()));
    assert!(loaded
        .report
        .warnings
        .iter()
        .any(|warning| warning.contains("links to missing tile st_000001")));

    let err = ctx.folder.load(true).unwrap_err();
    assert!(matches!(err, LoadError::Load(_)));
}

#[rstest]
fn strict_load_rejects_integrity_errors(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();

    let path = ctx.folder.tile_path(&ids.p2, TileVariant::PlotEvent);
    let mut json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    json["timeline_index"] = serde_json::json!(-5);
    fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let err = ctx.folder.load(true).unwrap_err();
    match err {
        LoadError::Integrity(report) => {
            assert!(report
                .errors
                .iter()
                .any(|error| error.contains("timeline_index is negative: -5")));
        }
        other => panic!("expected Integrity, got: {other:?}"),
    }

    let loaded = ctx.folder.load(false).unwrap();
    assert!(loaded.integrity.has_errors());
}

#[rstest]
fn duplicate_ids_in_scan_keep_the_later_file(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();
    fs::remove_file(ctx.folder.manifest_path()).unwrap();

    let original = ctx.folder.tile_path(&ids.hero, TileVariant::Character);
    let mut json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&original).unwrap()).unwrap();
    json["name"] = serde_json::json!("Mara Copy");
    fs::write(
        original.with_file_name("zz_copy.json"),
        serde_json::to_string_pretty(&json).unwrap(),
    )
    .unwrap();

    let loaded = ctx.folder.load(false).unwrap();
    assert_eq!(loaded.project.tile_count(), 5);
    assert_eq!(loaded.project.tile(&ids.hero).unwrap().name(), "Mara Copy");
    assert!(loaded
        .report
        .warnings
        .iter()
        .any(|warning| warning.starts_with("Duplicate tile ID ch_000001 found at")));
}

#[rstest]
fn unparseable_tile_is_a_load_error_but_scan_continues(ctx: ProjectFolderTestCtx) {
    let (mut project, _) = small_story();
    ctx.folder.save(&mut project).unwrap();
    fs::remove_file(ctx.folder.manifest_path()).unwrap();
    fs::write(ctx.root.join("Tiles/broken.json"), "{ not json").unwrap();

    let loaded = ctx.folder.load(false).unwrap();
    assert_eq!(loaded.project.tile_count(), 5);
    assert_eq!(loaded.report.errors.len(), 1);
}

#[rstest]
fn manifest_path_traversal_is_treated_as_missing(ctx: ProjectFolderTestCtx) {
    fs::create_dir_all(&ctx.root).unwrap();
    fs::write(ctx.tmp.path().join("outside.json"), r#"{"id": "st_out", "variant": "Setting", "name": "Out"}"#).unwrap();
    fs::write(
        ctx.root.join(MANIFEST_FILENAME),
        r#"{
  "project_name": "Escape",
  "project_id": "proj_00000001",
  "tiles": [{"id": "st_out", "variant": "Setting", "filepath": "../outside.json"}]
}"#,
    )
    .unwrap();

    let loaded = ctx.folder.load(false).unwrap();
    assert_eq!(loaded.project.tile_count(), 0);
    assert_eq!(loaded.report.missing_from_manifest, vec!["st_out".to_owned()]);
    assert!(loaded.report.fallback_used);
}

#[test]
fn relative_path_validation_rejects_escapes() {
    assert!(validate_relative_path("filepath", Path::new("Tiles/Settings/a.json")).is_ok());
    for bad in ["", "../a.json", "/etc/passwd", "Tiles/../../a.json"] {
        assert!(
            matches!(
                validate_relative_path("filepath", Path::new(bad)),
                Err(StoreError::InvalidRelativePath { .. })
            ),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn refused_rename_falls_back_to_copy_and_delete() {
    let tmp = TempDir::new("rename-fallback");
    let from = tmp.path().join("from");
    let to = tmp.path().join("to");
    fs::create_dir_all(from.join("Tiles/Settings")).unwrap();
    fs::write(from.join("manifest.json"), "{}").unwrap();
    fs::write(from.join("Tiles/Settings/st_1.json"), "{}").unwrap();

    rename_dir_with_fallback_using(&from, &to, |_, _| {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
    })
    .unwrap();

    assert!(!from.exists());
    assert!(to.join("manifest.json").is_file());
    assert!(to.join("Tiles/Settings/st_1.json").is_file());
}

#[test]
fn other_rename_errors_are_not_retried() {
    let tmp = TempDir::new("rename-error");
    let from = tmp.path().join("from");
    fs::create_dir_all(&from).unwrap();

    let err = rename_dir_with_fallback_using(&from, &tmp.path().join("to"), |_, _| {
        Err(io::Error::new(io::ErrorKind::Other, "boom"))
    })
    .unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(from.exists());
}

#[rstest]
#[case::plain("st_000001", "st_000001")]
#[case::device_name("CON", "~434f4e")]
#[case::device_name_lowercase("com7", "~636f6d37")]
#[case::leading_dot(".hidden", "~2e68696464656e")]
#[case::trailing_space("ch_1 ", "~63685f3120")]
#[case::reserved_char("a:b", "~613a62")]
#[case::not_a_device("COM10", "COM10")]
fn unsafe_ids_are_encoded_in_file_names(#[case] tile_id: &str, #[case] stem: &str) {
    assert_eq!(tile_file_stem(tile_id), stem);
}

#[rstest]
fn durable_save_round_trips(ctx: ProjectFolderTestCtx) {
    let folder = ctx.folder.clone().with_durability(WriteDurability::Durable);
    let (mut project, ids) = small_story();

    folder.save(&mut project).unwrap();
    folder.save(&mut project).unwrap();

    let loaded = folder.load(true).unwrap();
    assert_eq!(loaded.project, project);
    assert!(folder.tile_path(&ids.city, TileVariant::Setting).is_file());
    assert!(!folder.has_leftovers());
}

#[rstest]
fn temp_copy_without_manifest_keeps_project_metadata(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    project.set_author("Ana").unwrap();
    ctx.folder.save(&mut project).unwrap();
    ctx.folder.save(&mut project).unwrap();
    let project_id = project.meta().id.clone();

    // An interrupted save: tile files written, manifest never reached.
    ctx.folder
        .write_snapshot(&ctx.folder.temp_dir(), &project, 3)
        .unwrap();
    fs::remove_file(ctx.folder.temp_dir().join(MANIFEST_FILENAME)).unwrap();

    let report = ctx.folder.save(&mut project).unwrap();
    assert!(!report.adopted_recovered);
    assert_eq!(report.recovered_from, Some(RecoverySource::Root));
    assert_eq!(report.version, 3);
    assert!(!ctx.folder.temp_dir().exists());

    let meta = ctx.folder.load(true).unwrap().project.meta().clone();
    assert_eq!(meta.name.as_deref(), Some("Fixture Story"));
    assert_eq!(meta.author.as_deref(), Some("Ana"));
    assert_eq!(meta.id, project_id);
    assert_eq!(meta.version, MetaInt::Value(3));
    assert!(meta.tags.is_some_and(|tags| tags.contains("draft")));
    assert!(project.tile(&ids.city).is_some());
}

#[rstest]
#[case::tile_count_differs(
    |project: &mut Project| {
        project.create_tile(TileVariant::Setting, "Annex");
    },
    |_: &Path| {}
)]
#[case::integrity_error(
    |project: &mut Project| {
        let p1 = crate::model::fixtures::tid("pe_000001");
        if let Some(fields) = project.tile_mut(&p1).and_then(Tile::as_plot_event_mut) {
            fields.timeline_index = Some(-1);
        }
    },
    |_: &Path| {}
)]
#[case::load_error(
    |_: &mut Project| {},
    |dir: &Path| edit_manifest(dir, |manifest| manifest["tile_count"] = serde_json::json!(99))
)]
#[case::no_manifest(
    |_: &mut Project| {},
    |dir: &Path| fs::remove_file(dir.join(MANIFEST_FILENAME)).unwrap()
)]
#[case::last_modified_absent(
    |_: &mut Project| {},
    |dir: &Path| edit_manifest(dir, |manifest| {
        manifest.as_object_mut().unwrap().remove("last_modified");
    })
)]
#[case::last_modified_unparseable(
    |project: &mut Project| project.meta_mut().last_modified = Some("someday".to_owned()),
    |_: &Path| {}
)]
fn recovery_skips_unusable_newer_copies(
    ctx: ProjectFolderTestCtx,
    #[case] edit_project: fn(&mut Project),
    #[case] edit_files: fn(&Path),
) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();

    let mut newer = newer_copy(&project);
    newer.tile_mut(&ids.city).unwrap().set_name("Port Vell Reborn");
    edit_project(&mut newer);
    let temp = ctx.folder.temp_dir();
    ctx.folder.write_snapshot(&temp, &newer, 2).unwrap();
    edit_files(&temp);

    let recovered = recover(&ctx.folder, &project).expect("root copy qualifies");
    assert_eq!(recovered.source, RecoverySource::Root);
    assert_eq!(
        recovered.project.tile(&ids.city).unwrap().name(),
        "Port Vell"
    );
    // Rejected copies are left for the caller to clean up.
    assert!(temp.is_dir());
}

#[rstest]
fn recovery_without_a_usable_copy_changes_nothing(ctx: ProjectFolderTestCtx) {
    let (project, _) = small_story();
    let temp = ctx.folder.temp_dir();
    ctx.folder.write_snapshot(&temp, &newer_copy(&project), 2).unwrap();
    edit_manifest(&temp, |manifest| manifest["tile_count"] = serde_json::json!(99));
    let manifest_before = fs::read_to_string(temp.join(MANIFEST_FILENAME)).unwrap();

    assert!(recover(&ctx.folder, &project).is_none());
    assert!(!ctx.root.exists());
    assert_eq!(
        fs::read_to_string(temp.join(MANIFEST_FILENAME)).unwrap(),
        manifest_before
    );
}

#[rstest]
fn recovery_ties_prefer_the_live_folder(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();

    let mut same_time = project.clone();
    same_time.tile_mut(&ids.city).unwrap().set_name("Temp Port");
    ctx.folder
        .write_snapshot(&ctx.folder.temp_dir(), &same_time, 2)
        .unwrap();

    let recovered = recover(&ctx.folder, &project).unwrap();
    assert_eq!(recovered.source, RecoverySource::Root);
    assert!(recovered.promoted);
    assert_eq!(
        recovered.project.tile(&ids.city).unwrap().name(),
        "Port Vell"
    );
    assert!(!ctx.folder.temp_dir().exists());
}

#[rstest]
fn recovery_prefers_newer_temp_over_backup_and_promotes_it(ctx: ProjectFolderTestCtx) {
    let (project, ids) = small_story();
    let mut newer = newer_copy(&project);
    newer.tile_mut(&ids.city).unwrap().set_name("Temp Port");
    ctx.folder
        .write_snapshot(&ctx.folder.temp_dir(), &newer, 2)
        .unwrap();
    ctx.folder
        .write_snapshot(&ctx.folder.backup_dir(), &project, 1)
        .unwrap();

    let recovered = recover(&ctx.folder, &project).unwrap();
    assert_eq!(recovered.source, RecoverySource::Temp);
    assert!(recovered.promoted);
    assert!(!ctx.folder.has_leftovers());

    let loaded = ctx.folder.load(true).unwrap();
    assert_eq!(loaded.project.tile(&ids.city).unwrap().name(), "Temp Port");
    assert_eq!(loaded.project.meta().version, MetaInt::Value(2));
}

#[rstest]
fn failed_promotion_restores_the_backup(ctx: ProjectFolderTestCtx) {
    let (mut project, ids) = small_story();
    ctx.folder.save(&mut project).unwrap();

    let temp = ctx.folder.temp_dir();
    let backup = ctx.folder.backup_dir();
    let mut next = project.clone();
    next.tile_mut(&ids.city).unwrap().set_name("Temp Port");
    ctx.folder.write_snapshot(&temp, &next, 2).unwrap();

    let err = ctx
        .folder
        .promote_using(&temp, &backup, |from, to| {
            if from == temp.as_path() && to == ctx.root.as_path() {
                return Err(StoreError::Io {
                    path: from.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::Other, "locked"),
                });
            }
            rename_dir_with_fallback(from, to)
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));

    assert!(!backup.exists());
    assert!(temp.is_dir());
    let loaded = ctx.folder.load(true).unwrap();
    assert_eq!(loaded.project.meta().version, MetaInt::Value(1));
    assert_eq!(loaded.project.tile(&ids.city).unwrap().name(), "Port Vell");
}
