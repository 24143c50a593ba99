//! Pack file reading
//!
//! Extracts objects from `.pack` files at offsets supplied by the pack
//! index. Entries are either stored whole (zlib stream of the framed
//! body) or as a delta against a base: `ofs-delta` names the base by a
//! backwards byte distance inside the same pack, `ref-delta` names it by
//! object ID. Ref-delta bases that live outside the pack are fetched
//! through the `recurse` callback, which the store wires to its own
//! `read_inflated` so bases resolve across tiers.

use crate::artifacts::errors::ObjectError;
use crate::artifacts::objects::object::{GitObject, frame, parse_header};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::pack_index::PackIndex;
use anyhow::{Result, anyhow};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use flate2::{Decompress, FlushDecompress, Status};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

/// Callback used to resolve ref-delta bases not present in the pack at
/// hand; wired to the store's `read_inflated`
pub type Recurse<'a> = &'a dyn Fn(&ObjectId) -> Result<Option<Bytes>>;

const PACK_MAGIC: &[u8; 4] = b"PACK";
const PACK_HEADER_LEN: usize = 12;
const TRAILER_LEN: usize = 20;

/// Delta chains deeper than this indicate a corrupt (cyclic) pack
const MAX_DELTA_DEPTH: usize = 64;

const KIND_COMMIT: u8 = 1;
const KIND_TREE: u8 = 2;
const KIND_BLOB: u8 = 3;
const KIND_TAG: u8 = 4;
const KIND_OFS_DELTA: u8 = 6;
const KIND_REF_DELTA: u8 = 7;

/// Read an object out of a pack, parsed
pub fn read(
    index: &PackIndex,
    recurse: Recurse,
    pack: &[u8],
    oid: &ObjectId,
) -> Result<Option<GitObject>> {
    match read_inflated(index, recurse, pack, oid)? {
        Some(framed) => Ok(Some(GitObject::deserialize(&framed)?)),
        None => Ok(None),
    }
}

/// Read an object out of a pack as framed inflated bytes
pub fn read_inflated(
    index: &PackIndex,
    recurse: Recurse,
    pack: &[u8],
    oid: &ObjectId,
) -> Result<Option<Bytes>> {
    let Some(offset) = index.find_offset(oid) else {
        return Ok(None);
    };

    let (object_type, body) = decode_at(pack, index, recurse, offset, 0)?;
    Ok(Some(frame(object_type, &body)))
}

/// The pack name: SHA-1 over the sorted object IDs it contains
pub fn pack_name(keys: &[ObjectId]) -> Result<ObjectId> {
    let mut sorted: Vec<&ObjectId> = keys.iter().collect();
    sorted.sort();

    let mut hasher = Sha1::new();
    for oid in sorted {
        hasher.update(oid.to_raw());
    }
    ObjectId::from_raw(&hasher.finalize())
}

/// Scan a raw pack and build its index
///
/// Verifies the trailer checksum, walks every entry to learn offsets and
/// per-entry crcs, and resolves deltas (through `recurse` for out-of-pack
/// bases) so each contained object can be named.
pub fn index_pack(pack: &[u8], recurse: Recurse) -> Result<PackIndex> {
    if pack.len() < PACK_HEADER_LEN + TRAILER_LEN {
        return Err(anyhow!("pack truncated: {} bytes", pack.len()));
    }
    if &pack[..4] != PACK_MAGIC {
        return Err(anyhow!("bad pack magic"));
    }
    let version = BigEndian::read_u32(&pack[4..8]);
    if version != 2 {
        return Err(anyhow!("unsupported pack version {version}"));
    }
    let count = BigEndian::read_u32(&pack[8..12]) as usize;

    let trailer_start = pack.len() - TRAILER_LEN;
    let checksum = Sha1::digest(&pack[..trailer_start]);
    if checksum.as_slice() != &pack[trailer_start..] {
        return Err(anyhow!("pack checksum mismatch"));
    }
    let mut pack_checksum = [0u8; TRAILER_LEN];
    pack_checksum.copy_from_slice(&pack[trailer_start..]);

    // First pass: walk entries to learn their extents and payloads
    struct Pending {
        offset: u64,
        crc: u32,
        kind_code: u8,
        base: BaseRef,
        payload: Bytes,
    }

    let mut pending = Vec::with_capacity(count);
    let mut pos = PACK_HEADER_LEN as u64;
    for _ in 0..count {
        let offset = pos;
        let (kind_code, size, mut cursor) = parse_entry_header(pack, offset)?;
        let base = match kind_code {
            KIND_OFS_DELTA => {
                let (distance, consumed) = parse_ofs_distance(pack, cursor)?;
                cursor += consumed;
                BaseRef::Offset(
                    offset
                        .checked_sub(distance)
                        .ok_or_else(|| anyhow!("ofs-delta distance out of range"))?,
                )
            }
            KIND_REF_DELTA => {
                let raw = pack
                    .get(cursor as usize..cursor as usize + 20)
                    .ok_or_else(|| anyhow!("pack truncated in ref-delta base"))?;
                cursor += 20;
                BaseRef::Ref(ObjectId::from_raw(raw)?)
            }
            _ => BaseRef::None,
        };

        let (payload, consumed) = inflate_at(pack, cursor, size as usize)?;
        if payload.len() != size as usize {
            return Err(anyhow!(
                "pack entry at {offset}: inflated {} bytes, header declares {size}",
                payload.len()
            ));
        }
        let end = cursor + consumed as u64;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&pack[offset as usize..end as usize]);

        pending.push(Pending {
            offset,
            crc: hasher.finalize(),
            kind_code,
            base,
            payload: Bytes::from(payload),
        });
        pos = end;
    }
    if pos != trailer_start as u64 {
        return Err(anyhow!("pack has trailing garbage after {count} entries"));
    }

    // Second pass: resolve deltas until every entry has a kind and body
    let mut resolved: HashMap<u64, (ObjectType, Bytes)> = HashMap::new();
    let mut by_oid: HashMap<ObjectId, u64> = HashMap::new();
    let mut entries: Vec<(ObjectId, u64, u32)> = Vec::with_capacity(count);
    let mut remaining: Vec<&Pending> = pending.iter().collect();

    while !remaining.is_empty() {
        let mut deferred = Vec::new();
        let mut progressed = false;

        for entry in remaining {
            let result = match (&entry.base, entry.kind_code) {
                (BaseRef::None, code) => {
                    Some((object_type_of_code(code)?, entry.payload.clone()))
                }
                (BaseRef::Offset(base_offset), _) => resolved
                    .get(base_offset)
                    .map(|(object_type, base)| {
                        apply_delta(base, &entry.payload)
                            .map(|body| (*object_type, Bytes::from(body)))
                    })
                    .transpose()?,
                (BaseRef::Ref(base_oid), _) => {
                    let base = match by_oid.get(base_oid).and_then(|off| resolved.get(off)) {
                        Some((object_type, base)) => Some((*object_type, base.clone())),
                        None => recurse(base_oid)?
                            .map(|framed| split_framed(&framed))
                            .transpose()?,
                    };
                    base.map(|(object_type, base)| {
                        apply_delta(&base, &entry.payload)
                            .map(|body| (object_type, Bytes::from(body)))
                    })
                    .transpose()?
                }
            };

            match result {
                Some((object_type, body)) => {
                    let framed = frame(object_type, &body);
                    let oid = ObjectId::from_raw(&Sha1::digest(&framed))?;
                    by_oid.insert(oid.clone(), entry.offset);
                    resolved.insert(entry.offset, (object_type, body));
                    entries.push((oid, entry.offset, entry.crc));
                    progressed = true;
                }
                None => deferred.push(entry),
            }
        }

        if !progressed && !deferred.is_empty() {
            return Err(anyhow!("pack contains unresolvable delta bases"));
        }
        remaining = deferred;
    }

    Ok(PackIndex::new(entries, pack_checksum))
}

enum BaseRef {
    None,
    Offset(u64),
    Ref(ObjectId),
}

fn object_type_of_code(code: u8) -> Result<ObjectType> {
    match code {
        KIND_COMMIT => Ok(ObjectType::Commit),
        KIND_TREE => Ok(ObjectType::Tree),
        KIND_BLOB => Ok(ObjectType::Blob),
        KIND_TAG => Ok(ObjectType::Tag),
        _ => Err(anyhow!("invalid pack entry kind {code}")),
    }
}

/// Decode the object stored at `offset`, chasing delta bases
fn decode_at(
    pack: &[u8],
    index: &PackIndex,
    recurse: Recurse,
    offset: u64,
    depth: usize,
) -> Result<(ObjectType, Bytes)> {
    if depth > MAX_DELTA_DEPTH {
        return Err(anyhow!("delta chain deeper than {MAX_DELTA_DEPTH}, pack is corrupt"));
    }

    let (kind_code, size, mut cursor) = parse_entry_header(pack, offset)?;

    match kind_code {
        KIND_COMMIT | KIND_TREE | KIND_BLOB | KIND_TAG => {
            let (body, _) = inflate_at(pack, cursor, size as usize)?;
            if body.len() != size as usize {
                return Err(anyhow!(
                    "pack entry at {offset}: inflated {} bytes, header declares {size}",
                    body.len()
                ));
            }
            Ok((object_type_of_code(kind_code)?, Bytes::from(body)))
        }
        KIND_OFS_DELTA => {
            let (distance, consumed) = parse_ofs_distance(pack, cursor)?;
            cursor += consumed;
            let base_offset = offset
                .checked_sub(distance)
                .ok_or_else(|| anyhow!("ofs-delta distance out of range"))?;

            let (object_type, base) = decode_at(pack, index, recurse, base_offset, depth + 1)?;
            let (delta, _) = inflate_at(pack, cursor, size as usize)?;
            let body = apply_delta(&base, &delta)?;
            Ok((object_type, Bytes::from(body)))
        }
        KIND_REF_DELTA => {
            let raw = pack
                .get(cursor as usize..cursor as usize + 20)
                .ok_or_else(|| anyhow!("pack truncated in ref-delta base"))?;
            let base_oid = ObjectId::from_raw(raw)?;
            cursor += 20;

            let (object_type, base) = match index.find_offset(&base_oid) {
                Some(base_offset) => decode_at(pack, index, recurse, base_offset, depth + 1)?,
                None => {
                    let framed = recurse(&base_oid)?
                        .ok_or_else(|| anyhow!("delta base {base_oid} not found"))?;
                    split_framed(&framed)?
                }
            };
            let (delta, _) = inflate_at(pack, cursor, size as usize)?;
            let body = apply_delta(&base, &delta)?;
            Ok((object_type, Bytes::from(body)))
        }
        _ => Err(anyhow!("invalid pack entry kind {kind_code}")),
    }
}

/// Split framed inflated bytes into kind and body
fn split_framed(framed: &[u8]) -> Result<(ObjectType, Bytes)> {
    let (object_type, _, consumed) = parse_header(framed)?;
    Ok((object_type, Bytes::copy_from_slice(&framed[consumed..])))
}

/// Parse the `(kind, size)` varint header of the entry at `offset`;
/// returns the absolute position just past the header
fn parse_entry_header(pack: &[u8], offset: u64) -> Result<(u8, u64, u64)> {
    let mut pos = offset as usize;
    let first = *pack
        .get(pos)
        .ok_or_else(|| anyhow!("pack truncated at entry {offset}"))?;
    pos += 1;

    let kind_code = (first >> 4) & 0x7;
    let mut size = (first & 0xf) as u64;
    let mut shift = 4;
    let mut byte = first;
    while byte & 0x80 != 0 {
        byte = *pack
            .get(pos)
            .ok_or_else(|| anyhow!("pack truncated in entry header at {offset}"))?;
        pos += 1;
        size |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
    }

    Ok((kind_code, size, pos as u64))
}

/// Parse the big-endian base-distance varint of an ofs-delta entry
fn parse_ofs_distance(pack: &[u8], cursor: u64) -> Result<(u64, u64)> {
    let mut pos = cursor as usize;
    let mut byte = *pack
        .get(pos)
        .ok_or_else(|| anyhow!("pack truncated in ofs-delta header"))?;
    pos += 1;

    let mut distance = (byte & 0x7f) as u64;
    while byte & 0x80 != 0 {
        byte = *pack
            .get(pos)
            .ok_or_else(|| anyhow!("pack truncated in ofs-delta header"))?;
        pos += 1;
        distance = ((distance + 1) << 7) | (byte & 0x7f) as u64;
    }

    Ok((distance, (pos as u64) - cursor))
}

/// Inflate the zlib stream starting at `cursor`, returning the inflated
/// bytes and the number of compressed bytes consumed
fn inflate_at(pack: &[u8], cursor: u64, size_hint: usize) -> Result<(Vec<u8>, usize)> {
    let data = pack
        .get(cursor as usize..)
        .ok_or_else(|| anyhow!("pack truncated at payload offset {cursor}"))?;

    let mut decompress = Decompress::new(true);
    let mut out = Vec::with_capacity(size_hint.max(64));
    loop {
        let before_in = decompress.total_in();
        let before_out = out.len();

        let status = decompress
            .decompress_vec(&data[before_in as usize..], &mut out, FlushDecompress::Finish)
            .map_err(|_| ObjectError::MalformedCompression)?;

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if out.len() == out.capacity() {
                    out.reserve((out.capacity()).max(1024));
                } else if decompress.total_in() == before_in && out.len() == before_out {
                    // no progress and no capacity problem: truncated stream
                    return Err(ObjectError::MalformedCompression.into());
                }
            }
        }
    }

    Ok((out, decompress.total_in() as usize))
}

/// Read a little-endian 7-bit-group varint (delta size fields)
fn read_varint_le(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| anyhow!("delta truncated in size varint"))?;
        *pos += 1;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(anyhow!("delta size varint too long"));
        }
    }
    Ok(value)
}

/// Apply a delta to its base, producing the target bytes
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut pos = 0;
    let src_size = read_varint_le(delta, &mut pos)?;
    if src_size != base.len() as u64 {
        return Err(anyhow!(
            "delta source size {src_size} does not match base length {}",
            base.len()
        ));
    }
    let tgt_size = read_varint_le(delta, &mut pos)?;

    let mut out = Vec::with_capacity(tgt_size as usize);
    while pos < delta.len() {
        let op = delta[pos];
        pos += 1;

        if op & 0x80 != 0 {
            // copy from base: offset and length bytes selected by low bits
            let mut copy_offset = 0u64;
            for i in 0..4 {
                if op & (1 << i) != 0 {
                    let byte = *delta.get(pos).ok_or_else(|| anyhow!("delta truncated in copy op"))?;
                    pos += 1;
                    copy_offset |= (byte as u64) << (8 * i);
                }
            }
            let mut copy_len = 0u64;
            for i in 0..3 {
                if op & (0x10 << i) != 0 {
                    let byte = *delta.get(pos).ok_or_else(|| anyhow!("delta truncated in copy op"))?;
                    pos += 1;
                    copy_len |= (byte as u64) << (8 * i);
                }
            }
            if copy_len == 0 {
                copy_len = 0x10000;
            }

            let span = base
                .get(copy_offset as usize..(copy_offset + copy_len) as usize)
                .ok_or_else(|| anyhow!("delta copy out of base bounds"))?;
            out.extend_from_slice(span);
        } else if op != 0 {
            let span = delta
                .get(pos..pos + op as usize)
                .ok_or_else(|| anyhow!("delta truncated in insert op"))?;
            pos += op as usize;
            out.extend_from_slice(span);
        } else {
            return Err(anyhow!("reserved delta opcode 0"));
        }
    }

    if out.len() != tgt_size as usize {
        return Err(anyhow!(
            "delta produced {} bytes, expected {tgt_size}",
            out.len()
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::object::{Object, Packable, deflate};

    // Pack-building helpers mirroring the writer side of the format

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

    fn encode_ofs_distance(distance: u64) -> Vec<u8> {
        let mut parts = vec![(distance & 0x7f) as u8];
        let mut rest = distance >> 7;
        while rest > 0 {
            rest -= 1;
            parts.push((rest & 0x7f) as u8 | 0x80);
            rest >>= 7;
        }
        parts.reverse();
        parts
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

    fn compress(data: &[u8]) -> Vec<u8> {
        deflate(data, flate2::Compression::new(6)).unwrap().to_vec()
    }

    enum TestEntry<'a> {
        Whole(u8, &'a [u8]),
        OfsDelta { base_index: usize, delta: &'a [u8] },
        RefDelta { base: ObjectId, delta: &'a [u8] },
    }

    fn build_pack(entries: &[TestEntry]) -> (Vec<u8>, Vec<u64>) {
        let mut pack = Vec::new();
        pack.extend_from_slice(b"PACK");
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(entries.len() as u32).to_be_bytes());

        let mut offsets = Vec::new();
        for entry in entries {
            let offset = pack.len() as u64;
            offsets.push(offset);
            match entry {
                TestEntry::Whole(kind_code, body) => {
                    pack.extend_from_slice(&encode_entry_header(*kind_code, body.len()));
                    pack.extend_from_slice(&compress(body));
                }
                TestEntry::OfsDelta { base_index, delta } => {
                    pack.extend_from_slice(&encode_entry_header(KIND_OFS_DELTA, delta.len()));
                    pack.extend_from_slice(&encode_ofs_distance(offset - offsets[*base_index]));
                    pack.extend_from_slice(&compress(delta));
                }
                TestEntry::RefDelta { base, delta } => {
                    pack.extend_from_slice(&encode_entry_header(KIND_REF_DELTA, delta.len()));
                    pack.extend_from_slice(&base.to_raw());
                    pack.extend_from_slice(&compress(delta));
                }
            }
        }

        let checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&checksum);
        (pack, offsets)
    }

    fn delta_replacing_with(base_len: usize, replacement: &[u8]) -> Vec<u8> {
        let mut delta = encode_varint_le(base_len as u64);
        delta.extend_from_slice(&encode_varint_le(replacement.len() as u64));
        delta.push(replacement.len() as u8); // insert op
        delta.extend_from_slice(replacement);
        delta
    }

    fn no_recurse(_: &ObjectId) -> Result<Option<Bytes>> {
        Ok(None)
    }

    #[test]
    fn test_read_whole_object() {
        let blob = Blob::new(Bytes::from_static(b"hello\n"));
        let oid = blob.object_id().unwrap();
        let (pack, _) = build_pack(&[TestEntry::Whole(KIND_BLOB, b"hello\n")]);

        let index = index_pack(&pack, &no_recurse).unwrap();
        let object = read(&index, &no_recurse, &pack, &oid).unwrap().unwrap();
        pretty_assertions::assert_eq!(object, GitObject::Blob(blob));
    }

    #[test]
    fn test_read_ofs_delta() {
        let delta = delta_replacing_with(6, b"world\n");
        let (pack, _) = build_pack(&[
            TestEntry::Whole(KIND_BLOB, b"hello\n"),
            TestEntry::OfsDelta {
                base_index: 0,
                delta: &delta,
            },
        ]);

        let index = index_pack(&pack, &no_recurse).unwrap();
        let target = Blob::new(Bytes::from_static(b"world\n"));
        let object = read(&index, &no_recurse, &pack, &target.object_id().unwrap())
            .unwrap()
            .unwrap();
        pretty_assertions::assert_eq!(object, GitObject::Blob(target));
    }

    #[test]
    fn test_read_ref_delta_within_pack() {
        let base = Blob::new(Bytes::from_static(b"hello\n"));
        let delta = delta_replacing_with(6, b"world\n");
        let (pack, _) = build_pack(&[
            TestEntry::Whole(KIND_BLOB, b"hello\n"),
            TestEntry::RefDelta {
                base: base.object_id().unwrap(),
                delta: &delta,
            },
        ]);

        let index = index_pack(&pack, &no_recurse).unwrap();
        let target = Blob::new(Bytes::from_static(b"world\n"));
        let object = read(&index, &no_recurse, &pack, &target.object_id().unwrap())
            .unwrap()
            .unwrap();
        pretty_assertions::assert_eq!(object, GitObject::Blob(target));
    }

    #[test]
    fn test_ref_delta_base_resolved_through_recurse() {
        let base = Blob::new(Bytes::from_static(b"hello\n"));
        let base_framed = base.serialize().unwrap();
        let delta = delta_replacing_with(6, b"world\n");
        let (pack, _) = build_pack(&[TestEntry::RefDelta {
            base: base.object_id().unwrap(),
            delta: &delta,
        }]);

        let base_oid = base.object_id().unwrap();
        let recurse = move |oid: &ObjectId| -> Result<Option<Bytes>> {
            Ok((oid == &base_oid).then(|| base_framed.clone()))
        };

        let index = index_pack(&pack, &recurse).unwrap();
        let target = Blob::new(Bytes::from_static(b"world\n"));
        let object = read(&index, &recurse, &pack, &target.object_id().unwrap())
            .unwrap()
            .unwrap();
        pretty_assertions::assert_eq!(object, GitObject::Blob(target));
    }

    #[test]
    fn test_index_pack_rejects_bad_checksum() {
        let (mut pack, _) = build_pack(&[TestEntry::Whole(KIND_BLOB, b"hello\n")]);
        let len = pack.len();
        pack[len - 1] ^= 0xff;
        assert!(index_pack(&pack, &no_recurse).is_err());
    }

    #[test]
    fn test_index_pack_rejects_unresolvable_base() {
        let delta = delta_replacing_with(6, b"world\n");
        let (pack, _) = build_pack(&[TestEntry::RefDelta {
            base: ObjectId::try_parse("ce013625030ba8dba906f756967f9e9ca394464a").unwrap(),
            delta: &delta,
        }]);
        assert!(index_pack(&pack, &no_recurse).is_err());
    }

    #[test]
    fn test_apply_delta_copy_and_insert() {
        let base = b"the quick brown fox";
        // copy "the quick" then insert " red" then copy " fox"
        let mut delta = encode_varint_le(base.len() as u64);
        delta.extend_from_slice(&encode_varint_le(17));
        delta.push(0x90); // copy: offset omitted (0), one size byte
        delta.push(9);
        delta.push(4); // insert 4 bytes
        delta.extend_from_slice(b" red");
        delta.push(0x91); // copy: one offset byte, one size byte
        delta.push(15);
        delta.push(4);

        let out = apply_delta(base, &delta).unwrap();
        pretty_assertions::assert_eq!(out, b"the quick red fox");
    }

    #[test]
    fn test_apply_delta_rejects_wrong_base_size() {
        let delta = delta_replacing_with(5, b"x");
        assert!(apply_delta(b"hello\n", &delta).is_err());
    }

    #[test]
    fn test_pack_name_is_order_independent() {
        let a = ObjectId::try_parse("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        let b = ObjectId::try_parse("aab1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3").unwrap();
        pretty_assertions::assert_eq!(
            pack_name(&[a.clone(), b.clone()]).unwrap(),
            pack_name(&[b, a]).unwrap()
        );
    }
}
