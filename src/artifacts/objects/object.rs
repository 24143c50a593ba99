//! Core object traits, framing, and hashing
//!
//! Every object is stored as
//!
//! ```text
//! <kind> <size>\0<body>
//! ```
//!
//! zlib-deflated on disk. The object ID is the SHA-1 of the *inflated*
//! framing, so the serialized byte sequence is the identity: any two
//! objects with equal framed bytes are the same object.

use crate::artifacts::errors::ObjectError;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use anyhow::{Context, Result};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

/// Trait for serializing objects to the framed wire format
pub trait Packable {
    /// Serialize the object to bytes, including the header
    fn serialize(&self) -> Result<Bytes>;
}

/// Trait for deserializing objects from their body bytes (header already
/// consumed and validated)
pub trait Unpackable {
    fn deserialize(body: Bytes) -> Result<Self>
    where
        Self: Sized;
}

/// Common object operations
pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    /// A human-readable rendering of the object body
    fn display(&self) -> String;

    /// Compute the object ID: SHA-1 over the framed serialization
    fn object_id(&self) -> Result<ObjectId> {
        let content = self.serialize()?;
        let mut hasher = Sha1::new();
        hasher.update(&content);

        ObjectId::from_raw(&hasher.finalize())
    }
}

/// Build the framed form `<kind> SP <size> NUL <body>` for a body
pub fn frame(object_type: ObjectType, body: &[u8]) -> Bytes {
    let mut framed = Vec::with_capacity(body.len() + 16);
    framed.extend_from_slice(object_type.as_str().as_bytes());
    framed.push(b' ');
    framed.extend_from_slice(body.len().to_string().as_bytes());
    framed.push(0);
    framed.extend_from_slice(body);

    Bytes::from(framed)
}

/// Parse the header of a framed object
///
/// Returns the kind, the declared body size, and the number of header
/// bytes consumed (up to and including the NUL).
pub fn parse_header(data: &[u8]) -> Result<(ObjectType, usize, usize)> {
    let space = data
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::MalformedHeader("missing space delimiter".into()))?;
    let kind = std::str::from_utf8(&data[..space])
        .map_err(|_| ObjectError::MalformedHeader("non-UTF-8 kind name".into()))?;
    let object_type = ObjectType::try_from(kind)?;

    let nul = data[space + 1..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| space + 1 + p)
        .ok_or_else(|| ObjectError::MalformedHeader("missing NUL delimiter".into()))?;
    let size_str = std::str::from_utf8(&data[space + 1..nul])
        .map_err(|_| ObjectError::MalformedHeader("non-UTF-8 size".into()))?;

    if size_str.is_empty() || !size_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ObjectError::MalformedHeader(format!("non-integer size {size_str:?}")).into());
    }
    if size_str.len() > 1 && size_str.starts_with('0') {
        return Err(ObjectError::MalformedHeader(format!("leading zero in size {size_str:?}")).into());
    }
    let size: usize = size_str
        .parse()
        .map_err(|_| ObjectError::MalformedHeader(format!("size {size_str:?} overflows")))?;

    Ok((object_type, size, nul + 1))
}

/// Deflate bytes with the given zlib level
pub fn deflate(data: &[u8], level: flate2::Compression) -> Result<Bytes> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), level);
    encoder
        .write_all(data)
        .context("unable to compress object content")?;

    encoder
        .finish()
        .map(Bytes::from)
        .context("unable to finish compressing object content")
}

/// Inflate a zlib stream
pub fn inflate(data: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|_| ObjectError::MalformedCompression)?;

    Ok(Bytes::from(inflated))
}

/// An object of any kind
///
/// The tagged union over the four object kinds. This is the value the
/// store reads and writes; the variant types carry the kind-specific
/// codecs.
#[derive(Debug, Clone, PartialEq)]
pub enum GitObject {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl GitObject {
    /// Serialize and deflate at the given level
    pub fn serialize_deflated(&self, level: flate2::Compression) -> Result<Bytes> {
        deflate(&self.serialize()?, level)
    }

    /// Parse a framed (inflated) object
    ///
    /// Validates the header and the declared size, then dispatches to the
    /// kind-specific body parser.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let (object_type, size, header_len) = parse_header(data)?;
        let body = &data[header_len..];

        if body.len() != size {
            return Err(ObjectError::SizeMismatch {
                declared: size,
                actual: body.len(),
            }
            .into());
        }

        let body = Bytes::copy_from_slice(body);
        match object_type {
            ObjectType::Blob => Ok(GitObject::Blob(Blob::deserialize(body)?)),
            ObjectType::Tree => Ok(GitObject::Tree(Tree::deserialize(body)?)),
            ObjectType::Commit => Ok(GitObject::Commit(Commit::deserialize(body)?)),
            ObjectType::Tag => Ok(GitObject::Tag(Tag::deserialize(body)?)),
        }
    }

    /// Inflate, then parse
    pub fn deserialize_deflated(data: &[u8]) -> Result<Self> {
        Self::deserialize(&inflate(data)?)
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            GitObject::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            GitObject::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            GitObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            GitObject::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

impl Packable for GitObject {
    fn serialize(&self) -> Result<Bytes> {
        match self {
            GitObject::Blob(blob) => blob.serialize(),
            GitObject::Tree(tree) => tree.serialize(),
            GitObject::Commit(commit) => commit.serialize(),
            GitObject::Tag(tag) => tag.serialize(),
        }
    }
}

impl Object for GitObject {
    fn object_type(&self) -> ObjectType {
        match self {
            GitObject::Blob(_) => ObjectType::Blob,
            GitObject::Tree(_) => ObjectType::Tree,
            GitObject::Commit(_) => ObjectType::Commit,
            GitObject::Tag(_) => ObjectType::Tag,
        }
    }

    fn display(&self) -> String {
        match self {
            GitObject::Blob(blob) => blob.display(),
            GitObject::Tree(tree) => tree.display(),
            GitObject::Commit(commit) => commit.display(),
            GitObject::Tag(tag) => tag.display(),
        }
    }
}

impl From<Blob> for GitObject {
    fn from(blob: Blob) -> Self {
        GitObject::Blob(blob)
    }
}

impl From<Tree> for GitObject {
    fn from(tree: Tree) -> Self {
        GitObject::Tree(tree)
    }
}

impl From<Commit> for GitObject {
    fn from(commit: Commit) -> Self {
        GitObject::Commit(commit)
    }
}

impl From<Tag> for GitObject {
    fn from(tag: Tag) -> Self {
        GitObject::Tag(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::errors::ObjectError;

    #[test]
    fn test_frame_builds_header() {
        let framed = frame(ObjectType::Blob, b"hello\n");
        pretty_assertions::assert_eq!(framed.as_ref(), b"blob 6\0hello\n");
    }

    #[test]
    fn test_parse_header_round_trip() {
        let (object_type, size, consumed) = parse_header(b"commit 123\0xyz").unwrap();
        pretty_assertions::assert_eq!(object_type, ObjectType::Commit);
        pretty_assertions::assert_eq!(size, 123);
        pretty_assertions::assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_header_rejects_unknown_kind() {
        let err = parse_header(b"blobby 6\0hello\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ObjectError>(),
            Some(ObjectError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_parse_header_rejects_leading_zero() {
        let err = parse_header(b"blob 06\0hello\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ObjectError>(),
            Some(ObjectError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_parse_header_rejects_missing_nul() {
        let err = parse_header(b"blob 6hello").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ObjectError>(),
            Some(ObjectError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_deserialize_rejects_size_mismatch() {
        let err = GitObject::deserialize(b"blob 5\0hello\n").unwrap_err();
        pretty_assertions::assert_eq!(
            err.downcast_ref::<ObjectError>(),
            Some(&ObjectError::SizeMismatch {
                declared: 5,
                actual: 6
            })
        );
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        let err = inflate(b"not a zlib stream").unwrap_err();
        pretty_assertions::assert_eq!(
            err.downcast_ref::<ObjectError>(),
            Some(&ObjectError::MalformedCompression)
        );
    }

    #[test]
    fn test_known_blob_identity() {
        // sha1("blob 6\0hello\n")
        let blob = GitObject::Blob(Blob::new(Bytes::from_static(b"hello\n")));
        pretty_assertions::assert_eq!(
            blob.object_id().unwrap().to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
    }

    #[test]
    fn test_deflate_inflate_round_trip_at_all_levels() {
        let blob = GitObject::Blob(Blob::new(Bytes::from_static(b"hello\n")));
        for level in [0, 1, 6, 9] {
            let deflated = blob.serialize_deflated(flate2::Compression::new(level)).unwrap();
            let parsed = GitObject::deserialize_deflated(&deflated).unwrap();
            pretty_assertions::assert_eq!(parsed, blob);
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_blob_round_trips_inflated(
            content in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..2048)
        ) {
            let blob = GitObject::Blob(Blob::new(Bytes::from(content)));
            let framed = blob.serialize().unwrap();
            proptest::prop_assert_eq!(GitObject::deserialize(&framed).unwrap(), blob);
        }

        #[test]
        fn prop_blob_round_trips_deflated(
            content in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..2048),
            level in 0u32..=9
        ) {
            let blob = GitObject::Blob(Blob::new(Bytes::from(content)));
            let deflated = blob.serialize_deflated(flate2::Compression::new(level)).unwrap();
            proptest::prop_assert_eq!(GitObject::deserialize_deflated(&deflated).unwrap(), blob);
        }

        #[test]
        fn prop_object_id_is_digest_of_framing(
            content in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512)
        ) {
            let blob = GitObject::Blob(Blob::new(Bytes::from(content)));
            let framed = blob.serialize().unwrap();
            let expected = ObjectId::from_raw(&Sha1::digest(&framed)).unwrap();
            proptest::prop_assert_eq!(blob.object_id().unwrap(), expected);
        }
    }
}
