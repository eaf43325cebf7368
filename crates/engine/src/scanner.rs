//! Input enumeration for uploads.
//!
//! Expands the user's paths into an ordered list of regular files.
//! Directories are walked recursively (entries sorted by name, symlinks
//! followed).

use std::path::{Path, PathBuf};

use crate::error::TransferError;

/// Resolves `paths` to regular files and returns them with their total size.
///
/// Files keep argument order; a directory contributes its files in sorted
/// walk order. Missing paths and anything that is neither a regular file
/// nor a directory are validation errors.
pub fn collect_upload_files(paths: &[PathBuf]) -> Result<(Vec<PathBuf>, u64), TransferError> {
    let mut files = Vec::new();
    let mut total_size: u64 = 0;

    for path in paths {
        let metadata = std::fs::metadata(path).map_err(|e| stat_error(path, e))?;

        if metadata.is_dir() {
            walk_dir(path, &mut Vec::new(), &mut files, &mut total_size)?;
        } else if metadata.is_file() {
            files.push(path.clone());
            total_size += metadata.len();
        } else {
            return Err(not_regular(path));
        }
    }

    Ok((files, total_size))
}

/// `ancestors` holds the canonical paths of the directories being walked,
/// so a symlink back into one of them is reported instead of followed.
fn walk_dir(
    current: &Path,
    ancestors: &mut Vec<PathBuf>,
    files: &mut Vec<PathBuf>,
    total_size: &mut u64,
) -> Result<(), TransferError> {
    let canonical = std::fs::canonicalize(current).map_err(|e| stat_error(current, e))?;
    if ancestors.contains(&canonical) {
        return Err(TransferError::Validation(format!(
            "directory loop at {}",
            current.display()
        )));
    }

    let mut entries = std::fs::read_dir(current)
        .and_then(|dir| {
            dir.map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|e| stat_error(current, e))?;
    entries.sort();

    ancestors.push(canonical);
    for path in entries {
        // Follows symlinks.
        let metadata = std::fs::metadata(&path).map_err(|e| stat_error(&path, e))?;

        if metadata.is_dir() {
            walk_dir(&path, ancestors, files, total_size)?;
        } else if metadata.is_file() {
            *total_size += metadata.len();
            files.push(path);
        } else {
            return Err(not_regular(&path));
        }
    }
    ancestors.pop();

    Ok(())
}

fn stat_error(path: &Path, e: std::io::Error) -> TransferError {
    match e.kind() {
        std::io::ErrorKind::NotFound => {
            TransferError::Validation(format!("path not found: {}", path.display()))
        }
        _ => TransferError::Validation(format!("cannot stat {}: {e}", path.display())),
    }
}

fn not_regular(path: &Path) -> TransferError {
    TransferError::Validation(format!(
        "only directories or regular files are allowed: {}",
        path.display()
    ))
}
