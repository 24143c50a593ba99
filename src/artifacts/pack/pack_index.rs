//! Pack index (`.idx` version 2) parsing and serialization
//!
//! The index maps object IDs to byte offsets inside the paired `.pack`
//! file. Layout:
//!
//! ```text
//! magic \377tOc, version 2
//! fanout: 256 cumulative u32 counts by first oid byte
//! names:  n * 20-byte oids, sorted
//! crc32:  n * u32 over each entry's raw pack bytes
//! offsets: n * u31; high bit redirects into the 64-bit table
//! large offsets: u64 table for packs over 2 GiB
//! trailer: pack checksum, then index checksum
//! ```

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::{Result, anyhow};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::HashSet;

const MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];
const VERSION: u32 = 2;
const FANOUT_ENTRIES: usize = 256;
const RAW_OID_LENGTH: usize = OBJECT_ID_LENGTH / 2;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

/// Parsed pack index: sorted oids with their offsets and entry crcs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackIndex {
    oids: Vec<ObjectId>,
    offsets: Vec<u64>,
    crcs: Vec<u32>,
    pack_checksum: [u8; RAW_OID_LENGTH],
}

impl PackIndex {
    pub fn new(
        mut entries: Vec<(ObjectId, u64, u32)>,
        pack_checksum: [u8; RAW_OID_LENGTH],
    ) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut oids = Vec::with_capacity(entries.len());
        let mut offsets = Vec::with_capacity(entries.len());
        let mut crcs = Vec::with_capacity(entries.len());
        for (oid, offset, crc) in entries {
            oids.push(oid);
            offsets.push(offset);
            crcs.push(crc);
        }

        PackIndex {
            oids,
            offsets,
            crcs,
            pack_checksum,
        }
    }

    /// Parse an index file
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header_len = MAGIC.len() + 4 + FANOUT_ENTRIES * 4;
        if data.len() < header_len + 2 * RAW_OID_LENGTH {
            return Err(anyhow!("pack index truncated: {} bytes", data.len()));
        }
        if data[..4] != MAGIC {
            return Err(anyhow!("bad pack index magic"));
        }
        let version = BigEndian::read_u32(&data[4..8]);
        if version != VERSION {
            return Err(anyhow!("unsupported pack index version {version}"));
        }

        let fanout_base = 8;
        let count = BigEndian::read_u32(&data[fanout_base + 255 * 4..fanout_base + 256 * 4]) as usize;

        let names_base = header_len;
        let crc_base = names_base + count * RAW_OID_LENGTH;
        let offset_base = crc_base + count * 4;
        let large_base = offset_base + count * 4;
        if data.len() < large_base + 2 * RAW_OID_LENGTH {
            return Err(anyhow!("pack index truncated: {} bytes", data.len()));
        }

        let mut oids = Vec::with_capacity(count);
        for i in 0..count {
            let raw = &data[names_base + i * RAW_OID_LENGTH..names_base + (i + 1) * RAW_OID_LENGTH];
            oids.push(ObjectId::from_raw(raw)?);
        }

        let mut crcs = Vec::with_capacity(count);
        for i in 0..count {
            crcs.push(BigEndian::read_u32(&data[crc_base + i * 4..crc_base + (i + 1) * 4]));
        }

        let large_table = &data[large_base..data.len() - 2 * RAW_OID_LENGTH];
        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            let raw = BigEndian::read_u32(&data[offset_base + i * 4..offset_base + (i + 1) * 4]);
            if raw & LARGE_OFFSET_FLAG != 0 {
                let idx = (raw & !LARGE_OFFSET_FLAG) as usize;
                if large_table.len() < (idx + 1) * 8 {
                    return Err(anyhow!("pack index large-offset table truncated"));
                }
                offsets.push(BigEndian::read_u64(&large_table[idx * 8..(idx + 1) * 8]));
            } else {
                offsets.push(raw as u64);
            }
        }

        let mut pack_checksum = [0u8; RAW_OID_LENGTH];
        pack_checksum
            .copy_from_slice(&data[data.len() - 2 * RAW_OID_LENGTH..data.len() - RAW_OID_LENGTH]);

        Ok(PackIndex {
            oids,
            offsets,
            crcs,
            pack_checksum,
        })
    }

    /// Serialize to the on-disk `.idx` form
    pub fn serialize(&self) -> Result<Bytes> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.write_u32::<BigEndian>(VERSION)?;

        let mut fanout = [0u32; FANOUT_ENTRIES];
        for oid in &self.oids {
            fanout[oid.to_raw()[0] as usize] += 1;
        }
        let mut cumulative = 0u32;
        for bucket in fanout.iter_mut() {
            cumulative += *bucket;
            *bucket = cumulative;
        }
        for bucket in fanout {
            out.write_u32::<BigEndian>(bucket)?;
        }

        for oid in &self.oids {
            out.extend_from_slice(&oid.to_raw());
        }
        for crc in &self.crcs {
            out.write_u32::<BigEndian>(*crc)?;
        }

        let mut large_offsets: Vec<u64> = Vec::new();
        for offset in &self.offsets {
            if *offset < LARGE_OFFSET_FLAG as u64 {
                out.write_u32::<BigEndian>(*offset as u32)?;
            } else {
                out.write_u32::<BigEndian>(LARGE_OFFSET_FLAG | large_offsets.len() as u32)?;
                large_offsets.push(*offset);
            }
        }
        for offset in large_offsets {
            out.write_u64::<BigEndian>(offset)?;
        }

        out.extend_from_slice(&self.pack_checksum);
        let checksum = Sha1::digest(&out);
        out.extend_from_slice(&checksum);

        Ok(Bytes::from(out))
    }

    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        self.oids
            .binary_search(oid)
            .ok()
            .map(|i| self.offsets[i])
    }

    pub fn crc(&self, oid: &ObjectId) -> Option<u32> {
        self.oids.binary_search(oid).ok().map(|i| self.crcs[i])
    }

    pub fn mem(&self, oid: &ObjectId) -> bool {
        self.oids.binary_search(oid).is_ok()
    }

    /// The contained object IDs, in sorted order
    pub fn keys(&self) -> &[ObjectId] {
        &self.oids
    }

    pub fn key_set(&self) -> HashSet<ObjectId> {
        self.oids.iter().cloned().collect()
    }

    pub fn pack_checksum(&self) -> &[u8; RAW_OID_LENGTH] {
        &self.pack_checksum
    }

    pub fn len(&self) -> usize {
        self.oids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oids.is_empty()
    }
}
