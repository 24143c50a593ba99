#![allow(dead_code)]

use bytes::Bytes;
use chrono::DateTime;
use gitdb::artifacts::objects::blob::Blob;
use gitdb::artifacts::objects::commit::{Author, Commit};
use gitdb::artifacts::objects::object::{GitObject, Object, deflate};
use gitdb::artifacts::objects::object_id::ObjectId;
use gitdb::artifacts::objects::tree::{Tree, TreeRecord};
use gitdb::artifacts::index::entry_mode::{EntryMode, FileMode};
use gitdb::Store;
use sha1::{Digest, Sha1};

pub fn author() -> Author {
    let timestamp = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+00:00").unwrap();
    Author::new("Ada Lovelace".into(), "ada@example.com".into(), timestamp)
}

pub fn blob(content: &[u8]) -> GitObject {
    GitObject::Blob(Blob::new(Bytes::copy_from_slice(content)))
}

pub fn write_blob(store: &Store, content: &[u8]) -> ObjectId {
    store.write(&blob(content)).unwrap()
}

pub fn tree_record(mode: EntryMode, name: &str, oid: ObjectId) -> TreeRecord {
    TreeRecord::new(mode, Bytes::copy_from_slice(name.as_bytes()), oid)
}

pub fn regular(name: &str, oid: ObjectId) -> TreeRecord {
    tree_record(EntryMode::File(FileMode::Regular), name, oid)
}

pub fn write_tree(store: &Store, records: Vec<TreeRecord>) -> ObjectId {
    store.write(&GitObject::Tree(Tree::new(records))).unwrap()
}

pub fn write_commit(store: &Store, tree_oid: ObjectId, message: &str) -> ObjectId {
    let commit = Commit::new(tree_oid, vec![], author(), author(), message.to_string());
    store.write(&GitObject::Commit(commit)).unwrap()
}

// Synthetic pack construction, writer side of the pack format

pub const KIND_COMMIT: u8 = 1;
pub const KIND_TREE: u8 = 2;
pub const KIND_BLOB: u8 = 3;
pub const KIND_TAG: u8 = 4;
pub const KIND_OFS_DELTA: u8 = 6;
pub const KIND_REF_DELTA: u8 = 7;

pub enum PackEntry {
    Whole(u8, Vec<u8>),
    RefDelta { base: ObjectId, delta: Vec<u8> },
}

fn encode_entry_header(kind_code: u8, size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut size = size as u64;
    let mut byte = (kind_code << 4) | (size & 0xf) as u8;
    size >>= 4;
    while size > 0 {
        out.push(byte | 0x80);
        byte = (size & 0x7f) as u8;
        size >>= 7;
    }
    out.push(byte);
    out
}

fn encode_varint_le(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return out;
        }
    }
}

/// A delta that discards the base and inserts `replacement`
pub fn replacing_delta(base_len: usize, replacement: &[u8]) -> Vec<u8> {
    let mut delta = encode_varint_le(base_len as u64);
    delta.extend_from_slice(&encode_varint_le(replacement.len() as u64));
    delta.push(replacement.len() as u8);
    delta.extend_from_slice(replacement);
    delta
}

pub fn build_pack(entries: &[PackEntry]) -> Vec<u8> {
    let mut pack = Vec::new();
    pack.extend_from_slice(b"PACK");
    pack.extend_from_slice(&2u32.to_be_bytes());
    pack.extend_from_slice(&(entries.len() as u32).to_be_bytes());

    for entry in entries {
        match entry {
            PackEntry::Whole(kind_code, body) => {
                pack.extend_from_slice(&encode_entry_header(*kind_code, body.len()));
                pack.extend_from_slice(&deflate(body, flate2::Compression::new(6)).unwrap());
            }
            PackEntry::RefDelta { base, delta } => {
                pack.extend_from_slice(&encode_entry_header(KIND_REF_DELTA, delta.len()));
                pack.extend_from_slice(&base.to_raw());
                pack.extend_from_slice(&deflate(delta, flate2::Compression::new(6)).unwrap());
            }
        }
    }

    let checksum = Sha1::digest(&pack);
    pack.extend_from_slice(&checksum);
    pack
}

pub fn oid_of(object: &GitObject) -> ObjectId {
    object.object_id().unwrap()
}
