//! Atomic file writes via temp-name acquisition and rename.
//!
//! # Invariants
//! - The final path only ever holds a complete file: content is written to a
//!   temp name in the same directory and renamed into place on success.
//! - Any failure, including an error raised by the writer closure, discards
//!   the temp file.

use crate::error::{RepoError, RepoResult};
use std::fs::{self, File};
use std::path::Path;

/// Runs `write_fn` against a temp file next to `final_path`, then renames the
/// temp file onto `final_path`. On any error the temp file is removed and the
/// final path is left untouched.
pub fn safe_write<F>(final_path: &Path, write_fn: F) -> RepoResult<()>
where
    F: FnOnce(&mut File) -> RepoResult<()>,
{
    let dir = match final_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let prefix = final_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());

    // Same-directory temp name so the rename stays on one filesystem.
    let mut temp = tempfile::Builder::new()
        .prefix(prefix.as_str())
        .tempfile_in(dir)?;

    write_fn(temp.as_file_mut())?;
    temp.as_file_mut().sync_all()?;
    temp.persist(final_path)
        .map_err(|err| RepoError::Io(err.error))?;
    Ok(())
}
