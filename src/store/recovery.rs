// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Picks the best copy among the live, temp and backup folders after an interrupted save.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::loader::{load_project, LoadOptions};
use super::project_folder::{
    remove_dir_if_exists, rename_dir_with_fallback, ProjectFolder, StoreError,
};
use crate::check::check_project;
use crate::model::timestamp::parse_timestamp;
use crate::model::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySource {
    Root,
    Temp,
    Backup,
}

impl RecoverySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Temp => "temp",
            Self::Backup => "backup",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recovered {
    pub source: RecoverySource,
    pub project: Project,
    /// The winner now lives in the root folder.
    pub promoted: bool,
}

struct Candidate {
    source: RecoverySource,
    dir: PathBuf,
    project: Project,
    modified: DateTime<Utc>,
}

/// Chooses the newest valid copy and moves it into the root folder.
///
/// Returns `None`, without touching the disk, when no copy qualifies.
pub fn recover(folder: &ProjectFolder, current: &Project) -> Option<Recovered> {
    let options = folder.load_options();
    let mut candidates = Vec::new();

    for (source, dir) in [
        (RecoverySource::Root, folder.root().to_path_buf()),
        (RecoverySource::Temp, folder.temp_dir()),
        (RecoverySource::Backup, folder.backup_dir()),
    ] {
        if !dir.is_dir() {
            continue;
        }
        if let Some(candidate) = evaluate(source, dir, current, &options) {
            candidates.push(candidate);
        }
    }

    // Ties keep the earlier candidate: root, then temp, then backup.
    let mut winner_index: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let newer = winner_index.map_or(true, |best| candidate.modified > candidates[best].modified);
        if newer {
            winner_index = Some(index);
        }
    }
    let winner_index = winner_index?;
    let winner = candidates.swap_remove(winner_index);

    let mut location = winner.dir.clone();
    let mut promoted = winner.source == RecoverySource::Root;
    if !promoted {
        match promote_into_root(&winner.dir, folder.root()) {
            Ok(()) => {
                tracing::info!(
                    source = winner.source.as_str(),
                    root = %folder.root().display(),
                    "promoted recovered copy into the project folder"
                );
                location = folder.root().to_path_buf();
                promoted = true;
            }
            Err(err) => {
                tracing::error!(
                    source = winner.source.as_str(),
                    error = %err,
                    "cannot promote recovered copy; leaving it in place"
                );
            }
        }
    }

    for other in &candidates {
        if other.dir == location {
            continue;
        }
        if let Err(err) = remove_dir_if_exists(&other.dir) {
            tracing::warn!(path = %other.dir.display(), error = %err, "cannot remove stale copy");
        }
    }

    Some(Recovered {
        source: winner.source,
        project: winner.project,
        promoted,
    })
}

fn evaluate(
    source: RecoverySource,
    dir: PathBuf,
    current: &Project,
    options: &LoadOptions,
) -> Option<Candidate> {
    let (project, report) = match load_project(&dir, options) {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::warn!(source = source.as_str(), error = %err, "recovery candidate unreadable");
            return None;
        }
    };
    if !report.errors.is_empty() {
        tracing::warn!(
            source = source.as_str(),
            errors = report.errors.len(),
            "recovery candidate rejected: load errors"
        );
        return None;
    }
    // A copy without its own manifest data would replace the project's identity with defaults.
    if !report.defaulted_metadata.is_empty() {
        tracing::warn!(
            source = source.as_str(),
            fields = ?report.defaulted_metadata,
            "recovery candidate rejected: metadata not read from a manifest"
        );
        return None;
    }

    let integrity = check_project(&project);
    if integrity.has_errors() {
        tracing::warn!(
            source = source.as_str(),
            errors = integrity.errors.len(),
            "recovery candidate rejected: integrity errors"
        );
        return None;
    }

    if current.tile_count() > 0 && project.tile_count() != current.tile_count() {
        tracing::warn!(
            source = source.as_str(),
            expected = current.tile_count(),
            found = project.tile_count(),
            "recovery candidate rejected: tile count differs"
        );
        return None;
    }

    let Some(modified) = project
        .meta()
        .last_modified
        .as_deref()
        .and_then(parse_timestamp)
    else {
        tracing::warn!(
            source = source.as_str(),
            "recovery candidate rejected: unreadable last_modified"
        );
        return None;
    };

    Some(Candidate {
        source,
        dir,
        project,
        modified,
    })
}

fn promote_into_root(from: &Path, root: &Path) -> Result<(), StoreError> {
    if let Err(err) = remove_dir_if_exists(root) {
        tracing::warn!(root = %root.display(), error = %err, "cannot clear project folder before promotion");
    }
    rename_dir_with_fallback(from, root)
}
