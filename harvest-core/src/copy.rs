//! Recursive directory copy

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::{Error, Result};

/// Remove whatever is at `path`, file or directory
///
/// A missing path is not an error.
pub fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Recursively copy the contents of `src` into `dest`
///
/// Directories are created as needed and existing files are overwritten, so
/// copying the same source twice leaves `dest` unchanged. File permission
/// bits follow `fs::copy`. Returns the number of files copied.
pub fn copy_dir_all(src: &Path, dest: &Path) -> Result<u64> {
    let meta = fs::metadata(src)?;
    if !meta.is_dir() {
        return Err(Error::Other(format!(
            "Cannot copy {}: not a directory",
            src.display()
        )));
    }

    ensure_dir(dest)?;

    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Other(format!("Unexpected walk entry: {}", e)))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            // Replace rather than truncate so read-only copies can be overwritten
            if !is_dir(&target) {
                remove_existing(&target)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn ensure_dir(path: &Path) -> io::Result<()> {
    if !is_dir(path) {
        remove_existing(path)?;
    }
    fs::create_dir_all(path)
}

fn is_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
