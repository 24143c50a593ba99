//! Packed object tier
//!
//! Packs live under `objects/pack/` as `pack-<40-hex>.pack` plus their
//! `.idx` index. Parsed indices are kept in a small LRU since they are
//! consulted on every miss of the loose tier; the pack payload itself is
//! streamed through the weak [`FileCache`] per lookup, leaving residency
//! to the OS page cache.
//!
//! Short-hash resolution is not offered over packs; lookups require full
//! object IDs.

use crate::areas::write_file_atomic;
use crate::artifacts::cache::file_cache::FileCache;
use crate::artifacts::objects::object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pack::pack_index::PackIndex;
use crate::artifacts::pack::pack_reader::{self, Recurse};
use anyhow::{Context, Result};
use bytes::Bytes;
use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The hash naming a `(pack, idx)` pair
pub type PackSha = ObjectId;

/// Parsed indices kept hot
const INDEX_LRU_CAPACITY: usize = 8;

/// Key-set entries kept hot (counted in packs, not keys)
const KEYS_LRU_CAPACITY: usize = 128 * 1024;

pub struct Packed {
    pack_path: Box<Path>,
    temp_path: Box<Path>,
    files: Arc<FileCache>,
    index_lru: Mutex<LruCache<PackSha, Arc<PackIndex>>>,
    keys_lru: Mutex<LruCache<PackSha, Arc<HashSet<ObjectId>>>>,
}

impl std::fmt::Debug for Packed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packed")
            .field("pack_path", &self.pack_path)
            .finish_non_exhaustive()
    }
}

impl Packed {
    pub fn new(dot_git: &Path, files: Arc<FileCache>) -> Self {
        Packed {
            pack_path: dot_git.join("objects").join("pack").into_boxed_path(),
            temp_path: dot_git.join("tmp").into_boxed_path(),
            files,
            index_lru: Mutex::new(LruCache::new(
                NonZeroUsize::new(INDEX_LRU_CAPACITY).expect("non-zero capacity"),
            )),
            keys_lru: Mutex::new(LruCache::new(
                NonZeroUsize::new(KEYS_LRU_CAPACITY).expect("non-zero capacity"),
            )),
        }
    }

    fn index_path(&self, pack: &PackSha) -> PathBuf {
        self.pack_path.join(format!("pack-{pack}.idx"))
    }

    fn pack_file_path(&self, pack: &PackSha) -> PathBuf {
        self.pack_path.join(format!("pack-{pack}.pack"))
    }

    /// Enumerate pack names by their `.idx` files, sorted
    pub fn list(&self) -> Result<Vec<PackSha>> {
        if !self.pack_path.exists() {
            return Ok(Vec::new());
        }

        let mut packs = Vec::new();
        for entry in std::fs::read_dir(&self.pack_path)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(hex) = name.strip_prefix("pack-").and_then(|n| n.strip_suffix(".idx"))
                && let Ok(pack) = ObjectId::try_parse(hex)
            {
                packs.push(pack);
            }
        }
        packs.sort();

        Ok(packs)
    }

    /// The parsed index of a pack, through the LRU
    pub fn read_index(&self, pack: &PackSha) -> Result<Arc<PackIndex>> {
        if let Some(index) = self.index_lru.lock().expect("index lru poisoned").get(pack) {
            return Ok(index.clone());
        }

        let bytes = self.files.read(&self.index_path(pack))?;
        let index = Arc::new(PackIndex::parse(&bytes)?);
        self.index_lru
            .lock()
            .expect("index lru poisoned")
            .put(pack.clone(), index.clone());

        Ok(index)
    }

    /// The key set of a pack, through the LRU
    pub fn read_keys(&self, pack: &PackSha) -> Result<Arc<HashSet<ObjectId>>> {
        if let Some(keys) = self.keys_lru.lock().expect("keys lru poisoned").get(pack) {
            return Ok(keys.clone());
        }

        let index = self.read_index(pack)?;
        let keys = Arc::new(index.key_set());
        self.keys_lru
            .lock()
            .expect("keys lru poisoned")
            .put(pack.clone(), keys.clone());

        Ok(keys)
    }

    /// Write a pack file; a no-op when it already exists
    pub fn write_pack(&self, pack: &PackSha, bytes: &[u8]) -> Result<()> {
        let path = self.pack_file_path(pack);
        if path.exists() {
            return Ok(());
        }
        write_file_atomic(&path, &self.temp_path, bytes)
            .with_context(|| format!("unable to store pack {pack}"))
    }

    /// Write a pack index; a no-op when it already exists
    pub fn write_index(&self, pack: &PackSha, bytes: &[u8]) -> Result<()> {
        let path = self.index_path(pack);
        if path.exists() {
            return Ok(());
        }
        write_file_atomic(&path, &self.temp_path, bytes)
            .with_context(|| format!("unable to store pack index {pack}"))
    }

    pub fn mem_in_pack(&self, pack: &PackSha, oid: &ObjectId) -> Result<bool> {
        Ok(self.read_index(pack)?.mem(oid))
    }

    pub fn read_in_pack(
        &self,
        pack: &PackSha,
        oid: &ObjectId,
        recurse: Recurse,
    ) -> Result<Option<GitObject>> {
        let index = self.read_index(pack)?;
        if !index.mem(oid) {
            return Ok(None);
        }

        let bytes = self.files.read(&self.pack_file_path(pack))?;
        pack_reader::read(&index, recurse, &bytes, oid)
    }

    pub fn read_in_pack_inflated(
        &self,
        pack: &PackSha,
        oid: &ObjectId,
        recurse: Recurse,
    ) -> Result<Option<Bytes>> {
        let index = self.read_index(pack)?;
        if !index.mem(oid) {
            return Ok(None);
        }

        let bytes = self.files.read(&self.pack_file_path(pack))?;
        pack_reader::read_inflated(&index, recurse, &bytes, oid)
    }

    /// Read from the first pack that holds the object
    pub fn read(&self, oid: &ObjectId, recurse: Recurse) -> Result<Option<GitObject>> {
        for pack in self.list()? {
            if let Some(object) = self.read_in_pack(&pack, oid, recurse)? {
                return Ok(Some(object));
            }
        }
        Ok(None)
    }

    pub fn read_inflated(&self, oid: &ObjectId, recurse: Recurse) -> Result<Option<Bytes>> {
        for pack in self.list()? {
            if let Some(framed) = self.read_in_pack_inflated(&pack, oid, recurse)? {
                return Ok(Some(framed));
            }
        }
        Ok(None)
    }

    pub fn mem(&self, oid: &ObjectId) -> Result<bool> {
        for pack in self.list()? {
            if self.mem_in_pack(&pack, oid)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Drop both LRUs
    pub fn clear(&self) {
        self.index_lru.lock().expect("index lru poisoned").clear();
        self.keys_lru.lock().expect("keys lru poisoned").clear();
    }
}
