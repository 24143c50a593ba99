//! Storage areas: the on-disk repository layers

pub mod checkout;
pub mod index;
pub mod loose;
pub mod packed;
pub mod refs;
pub mod store;
pub mod workspace;

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write a file atomically: the content lands in a scratch file under
/// `temp_dir` and is renamed into place, so readers observe either the
/// old content or the new, never a partial write.
pub(crate) fn write_file_atomic(path: &Path, temp_dir: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("unable to create directory {}", parent.display()))?;
    }
    std::fs::create_dir_all(temp_dir)
        .with_context(|| format!("unable to create temp directory {}", temp_dir.display()))?;

    let temp_path = temp_dir.join(format!("tmp-{}", rand::random::<u32>()));
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("unable to open temp file {}", temp_path.display()))?;

    file.write_all(bytes)
        .with_context(|| format!("unable to write temp file {}", temp_path.display()))?;
    drop(file);

    let renamed = std::fs::rename(&temp_path, path);
    if renamed.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    renamed.with_context(|| format!("unable to rename temp file to {}", path.display()))
}
