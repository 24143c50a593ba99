//! Object identifier (SHA-1 hash)
//!
//! Object IDs are 40-character lowercase hexadecimal strings naming the
//! SHA-1 of an object's framed serialization. A [`ShortOid`] is any shorter
//! hex prefix, used for human-entered lookups.
//!
//! Objects are stored at `objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use anyhow::Context;
use std::io;
use std::path::PathBuf;

/// Full-length object identifier
///
/// A validated 40-character lowercase hex string. The binary 20-byte form
/// is produced on demand at codec boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate a full-length object ID
    pub fn try_parse(id: impl Into<String>) -> anyhow::Result<Self> {
        let id: String = id.into();
        if id.len() != OBJECT_ID_LENGTH {
            anyhow::bail!("invalid object ID length: {}", id.len());
        }
        if !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("invalid object ID characters: {id}");
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Build an object ID from its binary 20-byte form
    pub fn from_raw(raw: &[u8]) -> anyhow::Result<Self> {
        if raw.len() != OBJECT_ID_LENGTH / 2 {
            anyhow::bail!("invalid raw object ID length: {}", raw.len());
        }
        Ok(Self(hex::encode(raw)))
    }

    /// The binary 20-byte form
    pub fn to_raw(&self) -> [u8; OBJECT_ID_LENGTH / 2] {
        let mut raw = [0u8; OBJECT_ID_LENGTH / 2];
        // infallible: the constructor validated 40 hex digits
        hex::decode_to_slice(&self.0, &mut raw).expect("validated hex");
        raw
    }

    /// Write the binary 20-byte form to the given writer
    ///
    /// Used when serializing tree, commit, and tag bodies.
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        writer.write_all(&self.to_raw())?;
        Ok(())
    }

    /// Read the binary 20-byte form from the given reader
    pub fn read_raw_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_LENGTH / 2];
        reader.read_exact(&mut raw)?;
        Self::from_raw(&raw)
    }

    /// Convert to the loose-object path fragment `xx/yyyy...`
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// The hex form
    pub fn to_hex(&self) -> &str {
        &self.0
    }

    /// Whether this ID starts with the given prefix
    pub fn starts_with(&self, prefix: &ShortOid) -> bool {
        self.0.starts_with(prefix.as_str())
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hex prefix of an object ID, shorter than the full 40 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortOid(String);

impl ShortOid {
    /// Parse and validate a short hex prefix (1 to 39 characters)
    pub fn try_parse(prefix: impl Into<String>) -> anyhow::Result<Self> {
        let prefix: String = prefix.into();
        if prefix.is_empty() || prefix.len() >= OBJECT_ID_LENGTH {
            anyhow::bail!("invalid short hash length: {}", prefix.len());
        }
        if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("invalid short hash characters: {prefix}");
        }
        Ok(Self(prefix.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The directory part of the prefix: its first min(len, 2) characters
    pub fn dir_part(&self) -> &str {
        &self.0[..self.0.len().min(2)]
    }
}

impl std::fmt::Display for ShortOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShortOid {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::try_parse(s).context("parsing short hash")
    }
}
