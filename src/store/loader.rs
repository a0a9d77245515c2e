// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Reads a project folder into memory.
//!
//! The manifest is the primary index. When it is absent, unreadable, or loses too many of
//! its listed tiles, the loader falls back to scanning every tile file under the root.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use super::codec::{self, ManifestIn, ManifestMeta, ManifestTileIn, MANIFEST_FILENAME};
use super::project_folder::{validate_relative_path, StoreError};
use crate::model::ids::generate_tile_id;
use crate::model::{Project, ProjectMeta, Tile, TileId};

/// Default share of manifest-listed tiles that may fail before the manifest list is dropped.
pub const DEFAULT_MISSING_TOLERANCE: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub missing_tolerance: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            missing_tolerance: DEFAULT_MISSING_TOLERANCE,
        }
    }
}

/// What happened while loading. Errors here make a strict load fail; warnings never do.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoadReport {
    pub manifest_used: bool,
    pub fallback_used: bool,
    pub loaded_from_manifest: Vec<TileId>,
    /// Manifest ids (or `unknown`) whose listed file could not be loaded.
    pub missing_from_manifest: Vec<String>,
    /// Missing manifest tiles found elsewhere by the supplementary scan.
    pub recovered: Vec<TileId>,
    /// Tiles added by a folder scan: all of them after a full scan, only the ones the
    /// manifest does not list after a supplementary scan.
    pub loaded_from_fallback: Vec<TileId>,
    /// Project fields that were not read from a manifest and hold new-project defaults.
    pub defaulted_metadata: Vec<&'static str>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

pub fn load_project(
    root: &Path,
    options: &LoadOptions,
) -> Result<(Project, LoadReport), StoreError> {
    let metadata = fs::metadata(root).map_err(|source| StoreError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(StoreError::Io {
            path: root.to_path_buf(),
            source: io::Error::other("project root is not a directory"),
        });
    }

    let mut report = LoadReport::default();
    let Some(manifest) = read_manifest(root, &mut report) else {
        report.fallback_used = true;
        report.defaulted_metadata.extend(codec::META_FIELDS);
        let tiles = scan_folder(root, &BTreeSet::new(), &mut report);
        report.loaded_from_fallback.extend(tiles.keys().cloned());
        return Ok(finish(ProjectMeta::default(), tiles, None, report));
    };

    report.manifest_used = true;
    let ManifestMeta { meta, defaulted } = codec::manifest_meta(&manifest, &mut report.warnings);
    report.defaulted_metadata = defaulted;
    let declared = codec::manifest_tile_count(&manifest, &mut report.warnings);

    let Some(entries) = manifest.tiles.as_deref() else {
        report
            .warnings
            .push("Manifest has no 'tiles' list; scanning the project folder".to_owned());
        report.fallback_used = true;
        let tiles = scan_folder(root, &BTreeSet::new(), &mut report);
        report.loaded_from_fallback.extend(tiles.keys().cloned());
        return Ok(finish(meta, tiles, declared, report));
    };

    let mut loaded: BTreeMap<TileId, Tile> = BTreeMap::new();
    let mut missing: Vec<String> = Vec::new();
    for entry in entries {
        let label = entry.id.clone().unwrap_or_else(|| "unknown".to_owned());
        match load_listed_tile(root, entry) {
            Ok(mut tile) => {
                let tile_id = assign_id(&mut tile, entry, &loaded);
                if loaded.contains_key(&tile_id) {
                    report.warnings.push(format!(
                        "Duplicate tile ID {tile_id} listed in manifest. Using last loaded version."
                    ));
                }
                report.loaded_from_manifest.push(tile_id.clone());
                loaded.insert(tile_id, tile);
            }
            Err(err) => {
                report
                    .warnings
                    .push(format!("Tile {label} listed in manifest could not be loaded: {err}"));
                report.missing_from_manifest.push(label.clone());
                missing.push(label);
            }
        }
    }

    if missing.is_empty() {
        return Ok(finish(meta, loaded, declared, report));
    }

    let ratio = missing.len() as f64 / entries.len() as f64;
    report.fallback_used = true;
    if ratio > options.missing_tolerance {
        tracing::warn!(
            root = %root.display(),
            missing = missing.len(),
            listed = entries.len(),
            "too many manifest tiles missing; loading by folder scan"
        );
        report.warnings.push(format!(
            "{} of {} manifest tiles could not be loaded; manifest tile list ignored",
            missing.len(),
            entries.len()
        ));
        let tiles = scan_folder(root, &BTreeSet::new(), &mut report);
        report.loaded_from_fallback.extend(tiles.keys().cloned());
        return Ok(finish(meta, tiles, declared, report));
    }

    let reserved: BTreeSet<TileId> = loaded.keys().cloned().collect();
    let found = scan_folder(root, &reserved, &mut report);
    let mut tiles = loaded;

    for label in &missing {
        let Ok(tile_id) = TileId::new(label.as_str()) else {
            continue;
        };
        if tiles.contains_key(&tile_id) {
            continue;
        }
        if let Some(tile) = found.get(&tile_id) {
            tracing::info!(tile = %tile_id, "recovered tile missing from its manifest path");
            tiles.insert(tile_id.clone(), tile.clone());
            report.recovered.push(tile_id);
        }
    }

    for (tile_id, tile) in found {
        if let Entry::Vacant(slot) = tiles.entry(tile_id.clone()) {
            slot.insert(tile);
            report.loaded_from_fallback.push(tile_id);
        }
    }

    Ok(finish(meta, tiles, declared, report))
}

fn read_manifest(root: &Path, report: &mut LoadReport) -> Option<ManifestIn> {
    let path = root.join(MANIFEST_FILENAME);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            report
                .warnings
                .push("No manifest.json found; scanning the project folder".to_owned());
            return None;
        }
        Err(source) => {
            report
                .errors
                .push(StoreError::Io { path, source }.to_string());
            return None;
        }
    };

    match codec::decode_manifest(&path, &contents) {
        Ok(manifest) => Some(manifest),
        Err(err) => {
            report.errors.push(err.to_string());
            None
        }
    }
}

fn load_listed_tile(root: &Path, entry: &ManifestTileIn) -> Result<Tile, StoreError> {
    let Some(filepath) = entry.filepath.as_deref().filter(|path| !path.is_empty()) else {
        return Err(StoreError::InvalidRelativePath {
            field: "filepath",
            value: PathBuf::new(),
        });
    };

    let relative = PathBuf::from(filepath.replace('\\', "/"));
    validate_relative_path("filepath", &relative)?;
    codec::read_tile_file(&root.join(relative))
}

/// Keeps the tile's own id, falling back to the manifest entry and then to a fresh id.
fn assign_id(tile: &mut Tile, entry: &ManifestTileIn, taken: &BTreeMap<TileId, Tile>) -> TileId {
    if let Some(tile_id) = tile.id() {
        return tile_id.clone();
    }

    let tile_id = entry
        .id
        .as_deref()
        .and_then(|raw| TileId::new(raw).ok())
        .unwrap_or_else(|| {
            generate_tile_id(tile.variant().id_prefix(), |candidate| {
                taken.contains_key(candidate)
            })
        });
    tile.set_id(Some(tile_id.clone()));
    tile_id
}

/// Loads every tile file under `root` in lexical path order. A later file with an id
/// already seen replaces the earlier one.
fn scan_folder(
    root: &Path,
    reserved: &BTreeSet<TileId>,
    report: &mut LoadReport,
) -> BTreeMap<TileId, Tile> {
    let mut found: BTreeMap<TileId, Tile> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                report.errors.push(format!("cannot scan project folder: {err}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if entry.depth() == 1 && entry.file_name() == MANIFEST_FILENAME {
            continue;
        }
        if path.extension().map_or(true, |extension| extension != "json") {
            continue;
        }

        let mut tile = match codec::read_tile_file(path) {
            Ok(tile) => tile,
            Err(err) => {
                report.errors.push(err.to_string());
                continue;
            }
        };

        let tile_id = match tile.id() {
            Some(tile_id) => tile_id.clone(),
            None => {
                let tile_id = generate_tile_id(tile.variant().id_prefix(), |candidate| {
                    found.contains_key(candidate) || reserved.contains(candidate)
                });
                tile.set_id(Some(tile_id.clone()));
                tile_id
            }
        };

        if found.contains_key(&tile_id) {
            tracing::warn!(tile = %tile_id, path = %path.display(), "duplicate tile id in folder scan");
            report.warnings.push(format!(
                "Duplicate tile ID {tile_id} found at {}. Using last loaded version.",
                path.display()
            ));
        }
        found.insert(tile_id, tile);
    }

    found
}

fn finish(
    meta: ProjectMeta,
    tiles: BTreeMap<TileId, Tile>,
    declared: Option<usize>,
    mut report: LoadReport,
) -> (Project, LoadReport) {
    let mut project = Project::from_parts(meta, tiles);

    if let Some(declared) = declared {
        if declared != project.tile_count() {
            report.errors.push(format!(
                "Manifest expected {declared} tiles but loaded {}",
                project.tile_count()
            ));
        }
    }

    for reference in project.resolve_all() {
        report.warnings.push(reference.to_string());
    }

    (project, report)
}
