// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::codec::{self, MANIFEST_FILENAME, TILES_DIR};
use super::loader::{load_project, LoadOptions, LoadReport, DEFAULT_MISSING_TOLERANCE};
use super::recovery::{self, RecoverySource};
use crate::check::{check_project, IntegrityReport};
use crate::model::timestamp::parse_timestamp;
use crate::model::{IdError, Project, TileId, TileVariant};

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidId {
        path: PathBuf,
        value: String,
        source: Box<IdError>,
    },
    UnknownVariant {
        path: PathBuf,
        value: String,
    },
    InvalidRelativePath {
        field: &'static str,
        value: PathBuf,
    },
    PathOutsideProject {
        project_dir: PathBuf,
        path: PathBuf,
    },
    SymlinkRefused {
        path: PathBuf,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::InvalidId {
                path,
                value,
                source,
            } => write!(f, "invalid tile id {value:?} in {path:?}: {source}"),
            Self::UnknownVariant { path, value } => {
                write!(f, "unknown tile variant {value:?} in {path:?}")
            }
            Self::InvalidRelativePath { field, value } => {
                write!(f, "invalid relative path for {field}: {value:?}")
            }
            Self::PathOutsideProject { project_dir, path } => write!(
                f,
                "path is outside project dir: project_dir={project_dir:?} path={path:?}"
            ),
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidId { source, .. } => Some(source),
            Self::UnknownVariant { .. } => None,
            Self::InvalidRelativePath { .. } => None,
            Self::PathOutsideProject { .. } => None,
            Self::SymlinkRefused { .. } => None,
        }
    }
}

/// Why a save did not happen. The live folder is never left worse than before the call.
#[derive(Debug)]
pub enum SaveError {
    /// The in-memory project failed the pre-save integrity check; nothing was written.
    Integrity(IntegrityReport),
    /// Writing the temp snapshot failed; the live folder was not touched.
    WriteTemp(StoreError),
    /// Rotating the snapshot into place failed.
    Promote(StoreError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integrity(report) => write!(f, "save aborted: {report}"),
            Self::WriteTemp(err) => write!(f, "cannot write temp snapshot: {err}"),
            Self::Promote(err) => write!(f, "cannot promote temp snapshot: {err}"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Integrity(_) => None,
            Self::WriteTemp(err) | Self::Promote(err) => Some(err),
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    Store(StoreError),
    /// Strict load found file-level errors.
    Load(LoadReport),
    /// Strict load found integrity errors.
    Integrity(IntegrityReport),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "cannot load project: {err}"),
            Self::Load(report) => {
                write!(f, "project loaded with {} error(s)", report.errors.len())?;
                for error in &report.errors {
                    write!(f, "\n  error: {error}")?;
                }
                Ok(())
            }
            Self::Integrity(report) => write!(f, "project failed integrity check: {report}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Load(_) | Self::Integrity(_) => None,
        }
    }
}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// How hard a save pushes its files to stable storage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Flushing is left to the operating system.
    #[default]
    BestEffort,
    /// Every snapshot file is synced before the snapshot is promoted; on Unix the folders
    /// changed by the promotion renames are synced as well.
    Durable,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveReport {
    /// Version written to the manifest.
    pub version: i64,
    /// Copy chosen by recovery, when leftovers were found.
    pub recovered_from: Option<RecoverySource>,
    /// The in-memory project was replaced by a newer recovered copy before saving.
    pub adopted_recovered: bool,
    pub cleanup_warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProject {
    pub project: Project,
    pub report: LoadReport,
    pub integrity: IntegrityReport,
}

/// File stem for a tile id. Ids Windows cannot store verbatim (device names, a leading `.`
/// or `~`, a trailing `.` or space, reserved characters) become `~` plus their bytes in hex.
fn tile_file_stem(tile_id: &str) -> String {
    if !needs_stem_encoding(tile_id) {
        return tile_id.to_owned();
    }
    let hex: String = tile_id.bytes().map(|byte| format!("{byte:02x}")).collect();
    format!("~{hex}")
}

fn needs_stem_encoding(stem: &str) -> bool {
    const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    stem.starts_with(['.', '~'])
        || stem.ends_with(['.', ' '])
        || is_device_name(stem.split('.').next().unwrap_or_default())
        || stem
            .chars()
            .any(|ch| ch.is_ascii_control() || RESERVED.contains(&ch))
}

/// `CON`, `PRN`, `AUX`, `NUL`, `COM1`-`COM9` and `LPT1`-`LPT9`, in any case.
fn is_device_name(base: &str) -> bool {
    let upper = base.trim_end_matches(' ').to_ascii_uppercase();
    if matches!(upper.as_str(), "CON" | "PRN" | "AUX" | "NUL") {
        return true;
    }
    ["COM", "LPT"].iter().any(|prefix| {
        upper
            .strip_prefix(prefix)
            .is_some_and(|digit| matches!(digit.as_bytes(), [b'1'..=b'9']))
    })
}

/// A project folder on disk plus its `.tmp` and `.backup` siblings.
#[derive(Debug, Clone)]
pub struct ProjectFolder {
    root: PathBuf,
    durability: WriteDurability,
    missing_tolerance: f64,
}

impl ProjectFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
            missing_tolerance: DEFAULT_MISSING_TOLERANCE,
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    /// Fraction of manifest-listed tiles allowed to fail before the manifest list is
    /// discarded in favour of a full folder scan.
    pub fn with_missing_tolerance(mut self, missing_tolerance: f64) -> Self {
        self.missing_tolerance = missing_tolerance;
        self
    }

    pub fn missing_tolerance(&self) -> f64 {
        self.missing_tolerance
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            missing_tolerance: self.missing_tolerance,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> PathBuf {
        sibling_dir(&self.root, ".tmp")
    }

    pub fn backup_dir(&self) -> PathBuf {
        sibling_dir(&self.root, ".backup")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    pub fn tile_path(&self, tile_id: &TileId, variant: TileVariant) -> PathBuf {
        self.root.join(tile_relative_path(tile_id, variant))
    }

    pub fn has_leftovers(&self) -> bool {
        self.temp_dir().exists() || self.backup_dir().exists()
    }

    pub fn load(&self, strict: bool) -> Result<LoadedProject, LoadError> {
        let (project, report) = load_project(&self.root, &self.load_options())?;
        if strict && !report.errors.is_empty() {
            return Err(LoadError::Load(report));
        }

        let integrity = check_project(&project);
        if strict && integrity.has_errors() {
            return Err(LoadError::Integrity(integrity));
        }

        Ok(LoadedProject {
            project,
            report,
            integrity,
        })
    }

    /// Saves `project` through a temp snapshot and a backup rotation.
    ///
    /// On success the in-memory version is incremented. On failure the in-memory project is
    /// left as it was (apart from adopting a newer recovered copy).
    pub fn save(&self, project: &mut Project) -> Result<SaveReport, SaveError> {
        let mut report = SaveReport::default();
        let temp = self.temp_dir();
        let backup = self.backup_dir();

        if temp.exists() || backup.exists() {
            tracing::warn!(
                root = %self.root.display(),
                "found leftover temp or backup folder; entering recovery"
            );
            if let Some(recovered) = recovery::recover(self, project) {
                report.recovered_from = Some(recovered.source);
                if is_newer(&recovered.project, project) {
                    tracing::info!(
                        source = ?recovered.source,
                        "recovered a newer project; replacing in-memory state"
                    );
                    project.adopt(recovered.project);
                    report.adopted_recovered = true;
                }
            }
        }

        let integrity = check_project(project);
        if integrity.has_errors() {
            tracing::warn!(
                errors = integrity.errors.len(),
                "project has integrity errors; save aborted"
            );
            return Err(SaveError::Integrity(integrity));
        }

        let previous_modified = project.meta().last_modified.clone();
        project.touch();
        let version = project.meta().next_version();

        if let Err(err) = self.write_snapshot(&temp, project, version) {
            tracing::error!(path = %temp.display(), error = %err, "cannot write temp snapshot");
            if let Err(cleanup) = remove_dir_if_exists(&temp) {
                tracing::warn!(path = %temp.display(), error = %cleanup, "cannot remove partial temp snapshot");
            }
            project.meta_mut().last_modified = previous_modified;
            return Err(SaveError::WriteTemp(err));
        }

        if let Err(err) = self.promote(&temp, &backup) {
            project.meta_mut().last_modified = previous_modified;
            return Err(SaveError::Promote(err));
        }

        for leftover in [&temp, &backup] {
            if let Err(err) = remove_dir_if_exists(leftover) {
                tracing::warn!(path = %leftover.display(), error = %err, "cannot remove leftover folder");
                report
                    .cleanup_warnings
                    .push(format!("could not remove leftover folder {}: {err}", leftover.display()));
            }
        }

        project.bump_version();
        report.version = version;
        tracing::info!(root = %self.root.display(), version, tiles = project.tile_count(), "project saved");
        Ok(report)
    }

    /// Writes manifest and tile files for `project` into a fresh `dir`.
    pub(crate) fn write_snapshot(
        &self,
        dir: &Path,
        project: &Project,
        version: i64,
    ) -> Result<(), StoreError> {
        remove_dir_if_exists(dir)?;
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::with_capacity(project.tile_count());
        for (tile_id, tile) in project.tiles() {
            let relative = tile_relative_path(tile_id, tile.variant());
            let json = codec::encode_tile(tile_id, tile).map_err(|source| StoreError::Json {
                path: dir.join(&relative),
                source,
            })?;
            write_snapshot_file(&dir.join(&relative), json.as_bytes(), self.durability)?;
            entries.push(codec::ManifestEntry {
                id: tile_id,
                variant: tile.variant(),
                filepath: relative_path_string(&relative),
            });
        }

        let manifest_path = dir.join(MANIFEST_FILENAME);
        let json = codec::encode_manifest(project, version, &entries).map_err(|source| {
            StoreError::Json {
                path: manifest_path.clone(),
                source,
            }
        })?;
        write_snapshot_file(&manifest_path, json.as_bytes(), self.durability)
    }

    fn promote(&self, temp: &Path, backup: &Path) -> Result<(), StoreError> {
        self.promote_using(temp, backup, rename_dir_with_fallback)
    }

    /// Rotates root to `backup` and `temp` to root. If the second rename fails, the backup
    /// is moved back so the live folder keeps its previous contents.
    fn promote_using(
        &self,
        temp: &Path,
        backup: &Path,
        mut rename: impl FnMut(&Path, &Path) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if self.root.exists() {
            remove_dir_if_exists(backup)?;
            rename(&self.root, backup).map_err(|err| {
                tracing::error!(root = %self.root.display(), error = %err, "cannot rotate live folder to backup");
                err
            })?;
        }

        match rename(temp, &self.root) {
            Ok(()) => {
                if let Some(parent) = self.root.parent() {
                    sync_dir(parent, self.durability);
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(root = %self.root.display(), error = %err, "cannot promote temp snapshot");
                if !self.root.exists() && backup.exists() {
                    if let Err(restore) = rename(backup, &self.root) {
                        tracing::error!(
                            backup = %backup.display(),
                            error = %restore,
                            "cannot move backup back into place; backup kept"
                        );
                    }
                }
                Err(err)
            }
        }
    }
}

fn is_newer(candidate: &Project, current: &Project) -> bool {
    let stamp = |project: &Project| {
        project
            .meta()
            .last_modified
            .as_deref()
            .and_then(parse_timestamp)
    };
    matches!((stamp(candidate), stamp(current)), (Some(a), Some(b)) if a > b)
}

fn sibling_dir(root: &Path, suffix: &str) -> PathBuf {
    let mut name = root
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("project"));
    name.push(suffix);
    root.with_file_name(name)
}

pub(crate) fn tile_relative_path(tile_id: &TileId, variant: TileVariant) -> PathBuf {
    let file_stem = tile_file_stem(tile_id.as_str());
    Path::new(TILES_DIR)
        .join(variant.dir_name())
        .join(format!("{file_stem}.json"))
}

/// Manifest paths always use `/`, whatever the host separator.
fn relative_path_string(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

include!("project_folder/helpers.rs");

#[cfg(test)]
mod tests;
