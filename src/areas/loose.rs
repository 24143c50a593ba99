//! Loose object tier
//!
//! One zlib-deflated object per file under `objects/<xx>/<38-hex>`.
//! Writes are content-addressed and idempotent: an existing file is by
//! construction identical, so rewriting is skipped. Short-hash lookups
//! scan the prefix directory and fail on ambiguity rather than pick.

use crate::areas::write_file_atomic;
use crate::artifacts::cache::file_cache::FileCache;
use crate::artifacts::errors::StoreError;
use crate::artifacts::objects::object::{GitObject, Object, deflate, inflate};
use crate::artifacts::objects::object_id::{ObjectId, ShortOid};
use anyhow::{Context, Result};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sub-directories of `objects/` that do not hold loose objects
const RESERVED_DIRS: [&str; 2] = ["info", "pack"];

#[derive(Debug)]
pub struct Loose {
    objects_path: Box<Path>,
    temp_path: Box<Path>,
    level: flate2::Compression,
    files: Arc<FileCache>,
}

impl Loose {
    pub fn new(dot_git: &Path, level: flate2::Compression, files: Arc<FileCache>) -> Self {
        Loose {
            objects_path: dot_git.join("objects").into_boxed_path(),
            temp_path: dot_git.join("tmp").into_boxed_path(),
            level,
            files,
        }
    }

    fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_path.join(oid.to_path())
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).exists()
    }

    /// Read an object as framed inflated bytes
    pub fn read_inflated(&self, oid: &ObjectId) -> Result<Option<Bytes>> {
        let path = self.object_path(oid);
        if !path.exists() {
            return Ok(None);
        }

        let deflated = self.files.read(&path)?;
        Ok(Some(inflate(&deflated)?))
    }

    pub fn read(&self, oid: &ObjectId) -> Result<Option<GitObject>> {
        match self.read_inflated(oid)? {
            Some(framed) => Ok(Some(GitObject::deserialize(&framed)?)),
            None => Ok(None),
        }
    }

    /// Resolve a short hash to the unique loose object it prefixes
    ///
    /// Scans the prefix directories under `objects/`. More than one
    /// surviving candidate fails with [`StoreError::Ambiguous`]; none
    /// resolves to `None`.
    pub fn resolve_short(&self, short: &ShortOid) -> Result<Option<ObjectId>> {
        if !self.objects_path.exists() {
            return Ok(None);
        }

        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(&self.objects_path)? {
            let entry = entry?;
            let dir_name = entry.file_name();
            let dir_name = dir_name.to_string_lossy();
            if RESERVED_DIRS.contains(&dir_name.as_ref()) || !entry.path().is_dir() {
                continue;
            }
            if !dir_name.starts_with(short.dir_part()) {
                continue;
            }

            for file in std::fs::read_dir(entry.path())? {
                let file = file?;
                let file_name = file.file_name();
                let file_name = file_name.to_string_lossy();
                if let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}"))
                    && oid.starts_with(short)
                {
                    candidates.push(oid);
                }
            }

            if candidates.len() > 1 {
                return Err(StoreError::Ambiguous(short.to_string()).into());
            }
        }

        Ok(candidates.pop())
    }

    /// Write an object, returning its ID
    ///
    /// A no-op when the file already exists: loose files are write-once.
    pub fn write(&self, object: &GitObject) -> Result<ObjectId> {
        let oid = object.object_id()?;
        let path = self.object_path(&oid);
        if path.exists() {
            return Ok(oid);
        }

        let deflated = object.serialize_deflated(self.level)?;
        write_file_atomic(&path, &self.temp_path, &deflated)
            .with_context(|| format!("unable to store object {oid}"))?;
        tracing::trace!(oid = %oid, "stored loose object");

        Ok(oid)
    }

    /// Write an already framed inflated buffer
    pub fn write_inflated(&self, framed: &[u8]) -> Result<ObjectId> {
        let oid = ObjectId::from_raw(&Sha1::digest(framed))?;
        let path = self.object_path(&oid);
        if path.exists() {
            return Ok(oid);
        }

        let deflated = deflate(framed, self.level)?;
        write_file_atomic(&path, &self.temp_path, &deflated)
            .with_context(|| format!("unable to store object {oid}"))?;

        Ok(oid)
    }

    /// Enumerate all loose object IDs
    pub fn list(&self) -> Result<Vec<ObjectId>> {
        if !self.objects_path.exists() {
            return Ok(Vec::new());
        }

        let mut oids = Vec::new();
        for entry in std::fs::read_dir(&self.objects_path)? {
            let entry = entry?;
            let dir_name = entry.file_name();
            let dir_name = dir_name.to_string_lossy();
            if RESERVED_DIRS.contains(&dir_name.as_ref()) || !entry.path().is_dir() {
                continue;
            }

            for file in std::fs::read_dir(entry.path())? {
                let file_name = file?.file_name();
                let file_name = file_name.to_string_lossy();
                if let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}")) {
                    oids.push(oid);
                }
            }
        }

        Ok(oids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::object::Packable;

    fn loose_in(dir: &Path) -> Loose {
        Loose::new(dir, flate2::Compression::new(6), Arc::new(FileCache::new()))
    }

    fn blob(content: &'static [u8]) -> GitObject {
        GitObject::Blob(Blob::new(Bytes::from_static(content)))
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = assert_fs::TempDir::new().unwrap();
        let loose = loose_in(dir.path());
        let object = blob(b"hello\n");

        let oid = loose.write(&object).unwrap();
        pretty_assertions::assert_eq!(oid.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
        pretty_assertions::assert_eq!(loose.read(&oid).unwrap(), Some(object));
    }

    #[test]
    fn test_write_is_idempotent() {
        let dir = assert_fs::TempDir::new().unwrap();
        let loose = loose_in(dir.path());
        let object = blob(b"hello\n");

        let first = loose.write(&object).unwrap();
        let second = loose.write(&object).unwrap();
        pretty_assertions::assert_eq!(first, second);

        // exactly one file on disk, and its inflate is the framed form
        let path = dir.path().join("objects/ce/013625030ba8dba906f756967f9e9ca394464a");
        let stored = std::fs::read(&path).unwrap();
        pretty_assertions::assert_eq!(inflate(&stored).unwrap().as_ref(), b"blob 6\0hello\n");
    }

    #[test]
    fn test_write_inflated_matches_write() {
        let dir = assert_fs::TempDir::new().unwrap();
        let loose = loose_in(dir.path());
        let object = blob(b"hello\n");

        let oid = loose.write_inflated(&object.serialize().unwrap()).unwrap();
        pretty_assertions::assert_eq!(oid, object.object_id().unwrap());
        pretty_assertions::assert_eq!(loose.read(&oid).unwrap(), Some(object));
    }

    #[test]
    fn test_missing_object_reads_none() {
        let dir = assert_fs::TempDir::new().unwrap();
        let loose = loose_in(dir.path());
        let oid = ObjectId::try_parse("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        pretty_assertions::assert_eq!(loose.read(&oid).unwrap(), None);
    }

    #[test]
    fn test_list_skips_reserved_dirs() {
        let dir = assert_fs::TempDir::new().unwrap();
        let loose = loose_in(dir.path());
        let oid = loose.write(&blob(b"hello\n")).unwrap();
        std::fs::create_dir_all(dir.path().join("objects/pack")).unwrap();
        std::fs::create_dir_all(dir.path().join("objects/info")).unwrap();

        pretty_assertions::assert_eq!(loose.list().unwrap(), vec![oid]);
    }

    #[test]
    fn test_resolve_short_unique_and_ambiguous() {
        let dir = assert_fs::TempDir::new().unwrap();
        let loose = loose_in(dir.path());

        // aab1... and aab2...: distinct under "aab1", ambiguous under "aa"
        for content in [b"v1\n" as &[u8], b"v2\n"] {
            let object = GitObject::Blob(Blob::new(Bytes::copy_from_slice(content)));
            let oid = object.object_id().unwrap();
            let fake_dir = dir.path().join("objects/aa");
            std::fs::create_dir_all(&fake_dir).unwrap();
            // place the content under a synthetic aab-prefixed name
            let suffix = if content == b"v1\n" { "b1" } else { "b2" };
            std::fs::write(
                fake_dir.join(format!("{suffix}{}", &oid.to_hex()[4..])),
                b"",
            )
            .unwrap();
        }

        let unique = ShortOid::try_parse("aab1").unwrap();
        assert!(loose.resolve_short(&unique).unwrap().is_some());

        let ambiguous = ShortOid::try_parse("aa").unwrap();
        let err = loose.resolve_short(&ambiguous).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Ambiguous(_))
        ));

        let missing = ShortOid::try_parse("bb12").unwrap();
        pretty_assertions::assert_eq!(loose.resolve_short(&missing).unwrap(), None);
    }
}
