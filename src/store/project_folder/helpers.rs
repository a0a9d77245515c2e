// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-StoryAlign-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of StoryAlign and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Accepts only non-empty paths made of plain names (and `.`), so a manifest entry can
/// never point outside the project folder.
pub(crate) fn validate_relative_path(field: &'static str, path: &Path) -> Result<(), StoreError> {
    let stays_inside = !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if stays_inside {
        Ok(())
    } else {
        Err(StoreError::InvalidRelativePath {
            field,
            value: path.to_path_buf(),
        })
    }
}

/// Writes one file of a snapshot, creating its variant folder. The snapshot folder is
/// recreated for every save, so files are written in place.
fn write_snapshot_file(
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let io_error = |source: io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut file = fs::File::create(path).map_err(io_error)?;
    file.write_all(contents).map_err(io_error)?;
    if durability == WriteDurability::Durable {
        file.sync_all().map_err(io_error)?;
    }
    Ok(())
}

/// Syncs a directory entry after a rename. Failures are logged only.
fn sync_dir(dir: &Path, durability: WriteDurability) {
    if durability != WriteDurability::Durable || dir.as_os_str().is_empty() {
        return;
    }

    #[cfg(unix)]
    {
        if let Err(err) = fs::File::open(dir).and_then(|handle| handle.sync_all()) {
            tracing::warn!(path = %dir.display(), error = %err, "cannot sync directory");
        }
    }
}

pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Moves a folder. A rename refused with `PermissionDenied` (typically a locked file on
/// Windows) is retried once as copy plus delete.
pub(crate) fn rename_dir_with_fallback(from: &Path, to: &Path) -> Result<(), StoreError> {
    rename_dir_with_fallback_using(from, to, |from, to| fs::rename(from, to))
}

fn rename_dir_with_fallback_using(
    from: &Path,
    to: &Path,
    rename: impl FnOnce(&Path, &Path) -> io::Result<()>,
) -> Result<(), StoreError> {
    match rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            tracing::warn!(
                from = %from.display(),
                to = %to.display(),
                error = %err,
                "rename refused; retrying with copy and delete"
            );
            if let Err(copy_err) = copy_dir_all(from, to) {
                let _ = fs::remove_dir_all(to);
                return Err(copy_err);
            }
            fs::remove_dir_all(from).map_err(|source| StoreError::Io {
                path: from.to_path_buf(),
                source,
            })
        }
        Err(source) => Err(StoreError::Io {
            path: from.to_path_buf(),
            source,
        }),
    }
}

fn copy_dir_all(from: &Path, to: &Path) -> Result<(), StoreError> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| from.to_path_buf());
            StoreError::Io {
                path,
                source: io::Error::other(err.to_string()),
            }
        })?;

        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| StoreError::PathOutsideProject {
                project_dir: from.to_path_buf(),
                path: entry.path().to_path_buf(),
            })?;
        let target = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            return Err(StoreError::SymlinkRefused {
                path: entry.path().to_path_buf(),
            });
        }
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|source| StoreError::Io {
                path: target.clone(),
                source,
            })?;
        } else {
            fs::copy(entry.path(), &target).map_err(|source| StoreError::Io {
                path: target.clone(),
                source,
            })?;
        }
    }

    Ok(())
}
