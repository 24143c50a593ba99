//! Unified object store
//!
//! The read path goes cache, then loose, then packed; ref-delta bases in
//! packs recurse back through the full store, so a base may itself live
//! loose or in a different pack. Writes land in the loose tier except for
//! whole packs, which are stored with a freshly built index.

use crate::areas::loose::Loose;
use crate::areas::packed::Packed;
use crate::artifacts::cache::file_cache::FileCache;
use crate::artifacts::cache::value_cache::ValueCache;
use crate::artifacts::errors::StoreError;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::{ObjectId, ShortOid};
use crate::artifacts::pack::pack_reader;
use anyhow::{Context, Result};
use bytes::Bytes;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default zlib level for loose object writes
const DEFAULT_LEVEL: u32 = 6;

/// Construction-time configuration
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Repository root; defaults to the current directory
    pub root: Option<PathBuf>,
    /// Git directory; defaults to `<root>/.git`
    pub dot_git: Option<PathBuf>,
    /// zlib level in `0..=9`
    pub level: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            root: None,
            dot_git: None,
            level: DEFAULT_LEVEL,
        }
    }
}

pub struct Store {
    root: Box<Path>,
    dot_git: Box<Path>,
    values: ValueCache,
    files: Arc<FileCache>,
    loose: Loose,
    packed: Packed,
}

impl Store {
    /// Open (creating if needed) a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StoreOptions {
            root: Some(root.into()),
            ..Default::default()
        })
    }

    pub fn open(options: StoreOptions) -> Result<Self> {
        if options.level > 9 {
            return Err(StoreError::ConfigError(format!(
                "compression level {} out of range 0..=9",
                options.level
            ))
            .into());
        }
        let level = flate2::Compression::new(options.level);

        let root = match options.root {
            Some(root) => root,
            None => std::env::current_dir().context("unable to resolve current directory")?,
        };
        std::fs::create_dir_all(&root)
            .with_context(|| format!("unable to create repository root {}", root.display()))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("unable to resolve repository root {}", root.display()))?;

        let dot_git = options.dot_git.unwrap_or_else(|| root.join(".git"));
        let files = Arc::new(FileCache::new());
        let loose = Loose::new(&dot_git, level, files.clone());
        let packed = Packed::new(&dot_git, files.clone());

        Ok(Store {
            root: root.into_boxed_path(),
            dot_git: dot_git.into_boxed_path(),
            values: ValueCache::default(),
            files,
            loose,
            packed,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dot_git(&self) -> &Path {
        &self.dot_git
    }

    pub fn values(&self) -> &ValueCache {
        &self.values
    }

    /// Read an object: cache, then loose, then packed
    pub fn read(&self, oid: &ObjectId) -> Result<Option<GitObject>> {
        if let Some(object) = self.values.find(oid) {
            return Ok(Some(object));
        }

        if let Some(object) = self.loose.read(oid)? {
            self.values.insert(oid.clone(), object.clone());
            return Ok(Some(object));
        }

        let recurse = |base: &ObjectId| self.read_inflated(base);
        if let Some(object) = self.packed.read(oid, &recurse)? {
            self.values.insert(oid.clone(), object.clone());
            return Ok(Some(object));
        }

        Ok(None)
    }

    /// Read an object's framed inflated bytes
    pub fn read_inflated(&self, oid: &ObjectId) -> Result<Option<Bytes>> {
        if let Some(framed) = self.values.find_inflated(oid) {
            return Ok(Some(framed));
        }

        if let Some(framed) = self.loose.read_inflated(oid)? {
            self.values.insert_inflated(oid.clone(), framed.clone());
            return Ok(Some(framed));
        }

        let recurse = |base: &ObjectId| self.read_inflated(base);
        if let Some(framed) = self.packed.read_inflated(oid, &recurse)? {
            self.values.insert_inflated(oid.clone(), framed.clone());
            return Ok(Some(framed));
        }

        Ok(None)
    }

    /// Read an object that must exist
    pub fn read_exn(&self, oid: &ObjectId) -> Result<GitObject> {
        self.read(oid)?
            .ok_or_else(|| StoreError::NotFound(oid.to_string()).into())
    }

    /// Whether the object is present in any tier
    pub fn mem(&self, oid: &ObjectId) -> Result<bool> {
        if self.values.find(oid).is_some() {
            return Ok(true);
        }
        if self.loose.exists(oid) {
            return Ok(true);
        }
        self.packed.mem(oid)
    }

    /// Resolve a short hash against the loose tier
    ///
    /// Packed objects are not searched; a prefix matching only packed
    /// objects resolves to `None`.
    pub fn resolve_prefix(&self, short: &ShortOid) -> Result<Option<ObjectId>> {
        self.loose.resolve_short(short)
    }

    /// Read by short hash: the unique loose object with this prefix
    pub fn read_prefix(&self, short: &ShortOid) -> Result<Option<GitObject>> {
        match self.resolve_prefix(short)? {
            Some(oid) => self.read(&oid),
            None => Ok(None),
        }
    }

    /// All object IDs, loose and packed, de-duplicated
    pub fn list(&self) -> Result<Vec<ObjectId>> {
        let mut seen: HashSet<ObjectId> = self.loose.list()?.into_iter().collect();
        for pack in self.packed.list()? {
            seen.extend(self.packed.read_keys(&pack)?.iter().cloned());
        }

        let mut oids: Vec<ObjectId> = seen.into_iter().collect();
        oids.sort();
        Ok(oids)
    }

    /// Every stored object
    pub fn contents(&self) -> Result<Vec<(ObjectId, GitObject)>> {
        self.list()?
            .into_iter()
            .map(|oid| {
                let object = self.read_exn(&oid)?;
                Ok((oid, object))
            })
            .collect()
    }

    /// Write an object into the loose tier
    pub fn write(&self, object: &GitObject) -> Result<ObjectId> {
        let oid = self.loose.write(object)?;
        self.values.insert(oid.clone(), object.clone());
        Ok(oid)
    }

    /// Write an already framed inflated buffer into the loose tier
    pub fn write_inflated(&self, framed: &[u8]) -> Result<ObjectId> {
        let oid = self.loose.write_inflated(framed)?;
        self.values
            .insert_inflated(oid.clone(), Bytes::copy_from_slice(framed));
        Ok(oid)
    }

    /// Store a raw pack with a freshly built index; returns its key set
    pub fn write_pack(&self, raw_pack: &[u8]) -> Result<HashSet<ObjectId>> {
        let recurse = |base: &ObjectId| self.read_inflated(base);
        let index = pack_reader::index_pack(raw_pack, &recurse)?;
        let name = pack_reader::pack_name(index.keys())?;

        self.packed.write_pack(&name, raw_pack)?;
        self.packed.write_index(&name, &index.serialize()?)?;
        tracing::debug!(pack = %name, objects = index.len(), "stored pack");

        Ok(index.key_set())
    }

    /// Drop the file cache and the pack LRUs
    ///
    /// The value cache has its own lifecycle; use
    /// [`ValueCache::clear`](crate::artifacts::cache::value_cache::ValueCache::clear)
    /// through [`Store::values`] to drop it.
    pub fn clear(&self) {
        self.files.clear();
        self.packed.clear();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .field("dot_git", &self.dot_git)
            .finish_non_exhaustive()
    }
}
