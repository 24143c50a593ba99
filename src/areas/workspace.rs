//! Working-tree file materialization
//!
//! Writes blob content onto the filesystem with the retry and permission
//! behavior checkout needs: atomic writes with a bounded retry loop,
//! `0755` for executables, and symlinks whose target is the blob body.

use crate::areas::write_file_atomic;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::blob::Blob;
use anyhow::{Context, Result};
use std::path::Path;

/// Attempts per file before surfacing the write error
const WRITE_ATTEMPTS: usize = 10;

#[derive(Debug)]
pub struct Workspace {
    root: Box<Path>,
    temp_path: Box<Path>,
}

impl Workspace {
    pub fn new(root: &Path, dot_git: &Path) -> Self {
        Workspace {
            root: root.to_path_buf().into_boxed_path(),
            temp_path: dot_git.join("tmp").into_boxed_path(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stat a path relative to the root
    ///
    /// Does not follow symlinks, so a checked-out link stats as a link.
    pub fn stat_file(&self, path: &Path) -> Result<EntryMetadata> {
        let metadata = std::fs::symlink_metadata(self.root.join(path))
            .with_context(|| format!("unable to stat {}", path.display()))?;
        (&metadata).try_into()
    }

    /// Materialize a blob at a path relative to the root
    ///
    /// Regular files are written atomically, retrying on transient
    /// failures; each retry unlinks the target first. Executables are
    /// chmodded afterwards. Symlink entries become real symlinks whose
    /// target is the blob body.
    pub fn create_file(&self, path: &Path, mode: EntryMode, blob: &Blob) -> Result<()> {
        let absolute = self.root.join(path);

        if mode.is_symlink() {
            return self.create_symlink(&absolute, blob);
        }

        let mut attempts = WRITE_ATTEMPTS;
        loop {
            match write_file_atomic(&absolute, &self.temp_path, blob.content()) {
                Ok(()) => break,
                Err(error) => {
                    attempts -= 1;
                    if attempts == 0 {
                        return Err(error)
                            .with_context(|| format!("unable to write {}", path.display()));
                    }
                    tracing::warn!(
                        path = %path.display(),
                        attempts_left = attempts,
                        %error,
                        "retrying file write"
                    );
                    let _ = std::fs::remove_file(&absolute);
                }
            }
        }

        if mode.is_executable() {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&absolute, std::fs::Permissions::from_mode(0o755))
                    .with_context(|| format!("unable to chmod {}", path.display()))?;
            }
        }

        Ok(())
    }

    #[cfg(unix)]
    fn create_symlink(&self, absolute: &Path, blob: &Blob) -> Result<()> {
        let target = std::str::from_utf8(blob.content())
            .context("symlink target is not valid UTF-8")?;

        if let Some(parent) = absolute.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if absolute.symlink_metadata().is_ok() {
            std::fs::remove_file(absolute)
                .with_context(|| format!("unable to replace {}", absolute.display()))?;
        }
        std::os::unix::fs::symlink(target, absolute)
            .with_context(|| format!("unable to create symlink {}", absolute.display()))
    }

    #[cfg(not(unix))]
    fn create_symlink(&self, absolute: &Path, blob: &Blob) -> Result<()> {
        // no symlink primitive here: degrade to a regular file
        tracing::warn!(
            path = %absolute.display(),
            "platform does not support symlinks, writing link target as a file"
        );
        write_file_atomic(absolute, &self.temp_path, blob.content())
    }
}
