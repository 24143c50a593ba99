//! Reference layer
//!
//! References are human-readable names for commits. A loose ref is one
//! file under the git directory holding either a hash or a `ref: ` pointer
//! to another reference; names missing from the loose tier fall back to
//! the aggregated `packed-refs` file.
//!
//! Ref files are mutable, so they are read directly rather than through
//! the file cache, and written atomically. Concurrent writers race
//! last-writer-wins; callers serialize updates externally.

use crate::areas::write_file_atomic;
use crate::artifacts::errors::RefError;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::packed_refs::{self, PackedRefLine};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the head reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Symbolic chains longer than this are treated as cyclic
const MAX_SYMREF_DEPTH: usize = 5;

/// Contents of a ref file: a direct hash or a symbolic pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadContents {
    Oid(ObjectId),
    Symbolic(String),
}

impl HeadContents {
    /// Parse one line of ref-file content
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.trim();
        match content.strip_prefix("ref: ") {
            Some(target) => Ok(HeadContents::Symbolic(target.to_string())),
            None => Ok(HeadContents::Oid(
                ObjectId::try_parse(content).context("ref file holds neither hash nor pointer")?,
            )),
        }
    }

    /// The on-disk line, newline-terminated
    pub fn serialize(&self) -> String {
        match self {
            HeadContents::Oid(oid) => format!("{oid}\n"),
            HeadContents::Symbolic(target) => format!("ref: {target}\n"),
        }
    }
}

#[derive(Debug)]
pub struct Refs {
    dot_git: Box<Path>,
    temp_path: Box<Path>,
}

impl Refs {
    pub fn new(dot_git: &Path) -> Self {
        Refs {
            dot_git: dot_git.to_path_buf().into_boxed_path(),
            temp_path: dot_git.join("tmp").into_boxed_path(),
        }
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.dot_git.join(name)
    }

    fn packed_lines(&self) -> Result<Vec<PackedRefLine>> {
        let path = self.dot_git.join("packed-refs");
        if !path.exists() {
            return Ok(Vec::new());
        }
        // read directly: packed-refs is mutable, the file cache would
        // serve stale bytes
        let bytes = std::fs::read(&path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Ok(packed_refs::parse(&bytes))
    }

    /// All reference names: loose files under `refs/` plus packed refs
    ///
    /// De-duplication is left to the caller.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let refs_dir = self.dot_git.join("refs");
        if refs_dir.exists() {
            for entry in WalkDir::new(&refs_dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
            {
                if entry.path().is_file()
                    && let Ok(relative) = entry.path().strip_prefix(self.dot_git.as_ref())
                {
                    names.push(relative.to_string_lossy().into_owned());
                }
            }
        }

        names.extend(packed_refs::references(&self.packed_lines()?));
        Ok(names)
    }

    /// All reference names, de-duplicated across both tiers
    pub fn list_unique(&self) -> Result<BTreeSet<String>> {
        Ok(self.list()?.into_iter().collect())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.ref_path(name).exists()
    }

    /// Best-effort delete; a missing ref is success
    pub fn remove(&self, name: &str) -> Result<()> {
        match std::fs::remove_file(self.ref_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("unable to remove ref {name}")),
        }
    }

    /// Resolve a reference to a hash, chasing symbolic pointers
    ///
    /// A loose file wins over packed-refs at every hop. Chains longer
    /// than the chase bound fail with [`RefError::MalformedReference`].
    pub fn read(&self, name: &str) -> Result<Option<ObjectId>> {
        let mut current = name.to_string();

        for _ in 0..=MAX_SYMREF_DEPTH {
            let path = self.ref_path(&current);
            if !path.exists() {
                return Ok(packed_refs::find(&self.packed_lines()?, &current));
            }

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("unable to read ref {current}"))?;
            if content.trim().is_empty() {
                return Ok(None);
            }

            match HeadContents::parse(&content)? {
                HeadContents::Oid(oid) => return Ok(Some(oid)),
                HeadContents::Symbolic(target) => current = target,
            }
        }

        Err(RefError::MalformedReference(name.to_string()).into())
    }

    /// Resolve a reference that must exist
    pub fn read_exn(&self, name: &str) -> Result<ObjectId> {
        self.read(name)?
            .ok_or_else(|| RefError::NotFound(name.to_string()).into())
    }

    /// Read HEAD without chasing: the raw hash or pointer
    pub fn read_head(&self) -> Result<Option<HeadContents>> {
        let path = self.ref_path(HEAD_REF_NAME);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).context("unable to read HEAD")?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(HeadContents::parse(&content)?))
    }

    /// Point a reference at a hash, atomically
    pub fn write(&self, name: &str, oid: &ObjectId) -> Result<()> {
        write_file_atomic(
            &self.ref_path(name),
            &self.temp_path,
            HeadContents::Oid(oid.clone()).serialize().as_bytes(),
        )
        .with_context(|| format!("unable to write ref {name}"))
    }

    /// Write HEAD, direct or symbolic, atomically
    pub fn write_head(&self, contents: &HeadContents) -> Result<()> {
        write_file_atomic(
            &self.ref_path(HEAD_REF_NAME),
            &self.temp_path,
            contents.serialize().as_bytes(),
        )
        .context("unable to write HEAD")
    }
}
