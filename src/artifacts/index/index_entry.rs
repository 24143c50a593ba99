//! Index entry representation
//!
//! Each entry tracks one path: its content hash, its stat metadata for
//! fast change detection, and a flags word carrying the merge stage and
//! the path length.
//!
//! ## Binary layout
//!
//! 62 bytes of fixed fields (10 network-endian u32 stat words, the raw
//! 20-byte oid, a u16 flags word) followed by the path, NUL-padded to an
//! 8-byte boundary.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::anyhow;
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::cmp::min;
use std::fs::Metadata;
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::PathBuf;

/// Maximum path length representable in the flags word
const MAX_PATH_SIZE: usize = 0xfff;

/// Block size for entry alignment
pub const ENTRY_BLOCK: usize = 8;

/// Minimum size of a serialized entry in bytes
pub const ENTRY_MIN_SIZE: usize = 64;

/// Bit position of the merge stage inside the flags word
const STAGE_SHIFT: u32 = 12;
const STAGE_MASK: u32 = 0x3 << STAGE_SHIFT;

/// One tracked path
#[derive(Debug, Clone, Default, new)]
pub struct IndexEntry {
    /// Path relative to the repository root
    pub name: PathBuf,
    /// Hash of the staged content
    pub oid: ObjectId,
    /// Stat metadata for change detection
    pub metadata: EntryMetadata,
    /// Path length and merge stage bits
    pub flags: u32,
}

impl IndexEntry {
    /// Build a stage-0 entry for a freshly written file
    pub fn staged(name: PathBuf, oid: ObjectId, metadata: EntryMetadata) -> anyhow::Result<Self> {
        let name_len = name
            .to_str()
            .ok_or_else(|| anyhow!("invalid entry name"))?
            .len();
        let flags = min(name_len, MAX_PATH_SIZE) as u32;

        Ok(IndexEntry::new(name, oid, metadata, flags))
    }

    /// The merge stage: 0 for a normal entry, 1..=3 during a conflict
    pub fn stage(&self) -> u32 {
        (self.flags & STAGE_MASK) >> STAGE_SHIFT
    }

    /// Whether mode and size still match the given on-disk metadata
    pub fn stat_match(&self, other: &EntryMetadata) -> bool {
        (self.metadata.size == 0 || self.metadata.size == other.size)
            && self.metadata.mode == other.mode
    }

    /// Whether both timestamps still match the given on-disk metadata
    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.ctime == other.ctime
            && self.metadata.ctime_nsec == other.ctime_nsec
            && self.metadata.mtime == other.mtime
            && self.metadata.mtime_nsec == other.mtime_nsec
    }

    pub fn serialize(&self) -> anyhow::Result<Bytes> {
        let entry_name = self
            .name
            .to_str()
            .ok_or_else(|| anyhow!("invalid entry name"))?;

        let mut entry_bytes = Vec::new();
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime_nsec as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime_nsec as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.dev as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ino as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mode.as_u32())?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.uid)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.gid)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.size as u32)?;
        entry_bytes.extend_from_slice(&self.oid.to_raw());
        entry_bytes.write_u16::<byteorder::NetworkEndian>(self.flags as u16)?;
        entry_bytes.write_all(entry_name.as_bytes())?;

        // NUL-terminate and pad to the block boundary
        entry_bytes.push(0);
        while entry_bytes.len() % ENTRY_BLOCK != 0 {
            entry_bytes.push(0);
        }

        Ok(Bytes::from(entry_bytes))
    }

    pub fn deserialize(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() < ENTRY_MIN_SIZE {
            return Err(anyhow!("invalid index entry size"));
        }

        let ctime = byteorder::NetworkEndian::read_u32(&bytes[0..4]) as i64;
        let ctime_nsec = byteorder::NetworkEndian::read_u32(&bytes[4..8]) as i64;
        let mtime = byteorder::NetworkEndian::read_u32(&bytes[8..12]) as i64;
        let mtime_nsec = byteorder::NetworkEndian::read_u32(&bytes[12..16]) as i64;
        let dev = byteorder::NetworkEndian::read_u32(&bytes[16..20]) as u64;
        let ino = byteorder::NetworkEndian::read_u32(&bytes[20..24]) as u64;
        let mode = EntryMode::try_from(byteorder::NetworkEndian::read_u32(&bytes[24..28]))?;
        let uid = byteorder::NetworkEndian::read_u32(&bytes[28..32]);
        let gid = byteorder::NetworkEndian::read_u32(&bytes[32..36]);
        let size = byteorder::NetworkEndian::read_u32(&bytes[36..40]) as u64;
        let oid = ObjectId::from_raw(&bytes[40..60])?;
        let flags = byteorder::NetworkEndian::read_u16(&bytes[60..62]) as u32;

        let name_end = bytes[62..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| anyhow!("missing NUL terminator in entry name"))?;
        let name = PathBuf::from(
            std::str::from_utf8(&bytes[62..62 + name_end])
                .map_err(|_| anyhow!("invalid UTF-8 in entry name"))?,
        );

        Ok(IndexEntry {
            name,
            oid,
            metadata: EntryMetadata {
                ctime,
                ctime_nsec,
                mtime,
                mtime_nsec,
                dev,
                ino,
                mode,
                uid,
                gid,
                size,
            },
            flags,
        })
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.stage() == other.stage()
    }
}

impl Eq for IndexEntry {}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.stage().cmp(&other.stage()))
    }
}

/// Stat metadata stored per entry
///
/// Comparing this against a fresh `stat` detects working-tree changes
/// without reading file content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub ctime: i64,
    pub ctime_nsec: i64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub dev: u64,
    pub ino: u64,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
}

impl TryFrom<&Metadata> for EntryMetadata {
    type Error = anyhow::Error;

    fn try_from(metadata: &Metadata) -> anyhow::Result<Self> {
        let mode = if metadata.is_dir() {
            EntryMode::Directory
        } else if metadata.file_type().is_symlink() {
            EntryMode::Symlink
        } else if metadata.permissions().mode() & 0o111 != 0 {
            EntryMode::File(crate::artifacts::index::entry_mode::FileMode::Executable)
        } else {
            EntryMode::File(crate::artifacts::index::entry_mode::FileMode::Regular)
        };

        // the binary format stores these as u32; truncate at capture so a
        // rehydrated entry compares equal to a fresh stat
        Ok(Self {
            ctime: metadata.ctime() as u32 as i64,
            ctime_nsec: metadata.ctime_nsec() as u32 as i64,
            mtime: metadata.mtime() as u32 as i64,
            mtime_nsec: metadata.mtime_nsec() as u32 as i64,
            dev: metadata.dev() as u32 as u64,
            ino: metadata.ino() as u32 as u64,
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size() as u32 as u64,
        })
    }
}
