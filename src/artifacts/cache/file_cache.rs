//! Weak-reference file cache
//!
//! Maps absolute paths to file bytes, retaining only a `Weak` handle: the
//! returned `Arc` is owned by the caller, and once every caller drops it
//! the entry becomes reclaimable. Pack files and large blobs therefore
//! never stay pinned in memory; the OS page cache is authoritative, this
//! cache only shortcuts re-reads while somebody still holds the bytes.
//!
//! Dead slots are pruned on the next miss (there is no finalizer hook to
//! clear them eagerly).

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Default)]
pub struct FileCache {
    entries: Mutex<HashMap<PathBuf, Weak<[u8]>>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file through the cache
    ///
    /// A hit returns the live bytes; a miss reads from disk and stores a
    /// weak handle to the freshly read buffer.
    pub fn read(&self, path: &Path) -> Result<Arc<[u8]>> {
        let mut entries = self.entries.lock().expect("file cache poisoned");

        if let Some(bytes) = entries.get(path).and_then(Weak::upgrade) {
            return Ok(bytes);
        }

        let bytes: Arc<[u8]> = std::fs::read(path)
            .with_context(|| format!("unable to read file {}", path.display()))?
            .into();

        entries.retain(|_, slot| slot.strong_count() > 0);
        entries.insert(path.to_path_buf(), Arc::downgrade(&bytes));

        Ok(bytes)
    }

    /// Number of live (upgradable) entries
    pub fn live_entries(&self) -> usize {
        self.entries
            .lock()
            .expect("file cache poisoned")
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("file cache poisoned").clear();
    }
}
