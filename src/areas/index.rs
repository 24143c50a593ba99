//! The index file
//!
//! Tracks the paths materialized into the working tree, keyed by their
//! relative names, with the stat metadata used to skip unchanged files on
//! the next checkout. Persisted in the version-2 binary format with a
//! trailing SHA-1 (see [`crate::artifacts::index`]).

use crate::areas::write_file_atomic;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{ENTRY_BLOCK, ENTRY_MIN_SIZE, IndexEntry};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Index {
    path: Box<Path>,
    temp_path: Box<Path>,
    entries: BTreeMap<PathBuf, IndexEntry>,
    header: IndexHeader,
    changed: bool,
}

impl Index {
    pub fn new(dot_git: &Path) -> Self {
        Index {
            path: dot_git.join("index").into_boxed_path(),
            temp_path: dot_git.join("tmp").into_boxed_path(),
            entries: BTreeMap::new(),
            header: IndexHeader::empty(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.header = IndexHeader::empty();
        self.changed = false;
    }

    /// Load the index from disk, verifying the trailing checksum
    ///
    /// A missing or empty file loads as an empty index.
    pub fn rehydrate(&mut self) -> Result<()> {
        self.clear();

        if !self.path.exists() {
            return Ok(());
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("unable to read index {}", self.path.display()))?;
        if bytes.is_empty() {
            return Ok(());
        }

        let mut reader = Checksum::new(Cursor::new(bytes));
        let entries_count = self.parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;

        reader.verify()
    }

    fn parse_header(&mut self, reader: &mut Checksum<Cursor<Vec<u8>>>) -> Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::deserialize(header_bytes)?;

        if header.marker != SIGNATURE {
            return Err(anyhow!("invalid index file signature"));
        }
        if header.version != VERSION {
            return Err(anyhow!("unsupported index file version: {}", header.version));
        }

        Ok(header.entries_count)
    }

    /// Entries are block-aligned: keep reading blocks until the trailing
    /// NUL padding shows up
    fn parse_entries(
        &mut self,
        entries_count: u32,
        reader: &mut Checksum<Cursor<Vec<u8>>>,
    ) -> Result<()> {
        for _ in 0..entries_count {
            let mut entry_bytes = reader.read(ENTRY_MIN_SIZE)?.to_vec();
            while entry_bytes[entry_bytes.len() - 1] != 0 {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
            }

            let entry = IndexEntry::deserialize(&entry_bytes)?;
            self.entries.insert(entry.name.clone(), entry);
        }

        self.header.entries_count = entries_count;
        Ok(())
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn add(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.name.clone(), entry);
        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;
    }

    pub fn remove(&mut self, path: &Path) {
        if self.entries.remove(path).is_some() {
            self.header.entries_count = self.entries.len() as u32;
            self.changed = true;
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize and atomically replace the on-disk index
    pub fn write_updates(&mut self) -> Result<()> {
        let mut writer = Checksum::new(Vec::new());

        self.header.entries_count = self.entries.len() as u32;
        writer.write(&self.header.serialize()?)?;
        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }
        writer.write_checksum()?;

        write_file_atomic(&self.path, &self.temp_path, &writer.into_inner())
            .with_context(|| format!("unable to write index {}", self.path.display()))?;
        self.changed = false;

        Ok(())
    }
}
