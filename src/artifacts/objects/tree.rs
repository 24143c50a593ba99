//! Tree object
//!
//! Trees are directory snapshots: an ordered list of named entries, each
//! pointing at a blob (file), another tree (directory), or a commit
//! (submodule).
//!
//! ## Format
//!
//! Each entry on disk: `<octal-mode> SP <name> NUL <20-byte-oid>`. Entry
//! order is preserved exactly as stored; it is part of the object's
//! identity.

use crate::artifacts::errors::ObjectError;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

/// A single tree entry: mode, name, and the child object it points at
///
/// Names are raw bytes (anything but NUL and `/`); they are not required
/// to be UTF-8, so reserialization is byte-exact for every valid tree.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeRecord {
    pub mode: EntryMode,
    pub name: Bytes,
    pub oid: ObjectId,
}

/// A directory snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeRecord>,
}

impl Tree {
    pub fn new(entries: Vec<TreeRecord>) -> Self {
        Tree { entries }
    }

    pub fn entries(&self) -> &[TreeRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn malformed(reason: impl Into<String>) -> anyhow::Error {
        ObjectError::MalformedBody {
            kind: "tree",
            reason: reason.into(),
        }
        .into()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> Result<Bytes> {
        let mut body = Vec::new();

        for entry in &self.entries {
            body.extend_from_slice(entry.mode.as_str().as_bytes());
            body.push(b' ');
            body.extend_from_slice(&entry.name);
            body.push(0);
            entry.oid.write_raw_to(&mut body)?;
        }

        Ok(frame(ObjectType::Tree, &body))
    }
}

impl Unpackable for Tree {
    fn deserialize(body: Bytes) -> Result<Self> {
        let mut reader = body.as_ref();
        let mut entries = Vec::new();

        // Scratch buffers reused across entries
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.last() != Some(&b' ') {
                return Err(Tree::malformed("unexpected EOF in mode"));
            }
            mode_bytes.pop();

            let mode_str = std::str::from_utf8(&mode_bytes)
                .map_err(|_| Tree::malformed("non-UTF-8 mode"))?;
            let mode = EntryMode::from_octal_str(mode_str)
                .map_err(|e| Tree::malformed(e.to_string()))?;

            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || name_bytes.last() != Some(&b'\0') {
                return Err(Tree::malformed("unexpected EOF in name"));
            }
            name_bytes.pop();
            if name_bytes.is_empty() || name_bytes.contains(&b'/') {
                return Err(Tree::malformed("invalid entry name"));
            }
            let name = Bytes::copy_from_slice(&name_bytes);

            let oid = ObjectId::read_raw_from(&mut reader)
                .map_err(|_| Tree::malformed("unexpected EOF in object id"))?;

            entries.push(TreeRecord::new(mode, name, oid));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                let kind = if entry.mode.is_tree() { "tree" } else { "blob" };
                format!(
                    "{} {} {}\t{}",
                    entry.mode.as_str(),
                    kind,
                    entry.oid,
                    String::from_utf8_lossy(&entry.name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use rstest::{fixture, rstest};
    use sha1::{Digest, Sha1};

    #[fixture]
    fn oid() -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(b"test data");
        ObjectId::from_raw(&hasher.finalize()).unwrap()
    }

    #[rstest]
    fn test_serialize_entry_wire_form(oid: ObjectId) {
        let tree = Tree::new(vec![TreeRecord::new(
            EntryMode::File(FileMode::Regular),
            "a.txt".into(),
            oid.clone(),
        )]);

        let framed = tree.serialize().unwrap();
        let mut expected = b"tree 33\0100644 a.txt\0".to_vec();
        expected.extend_from_slice(&oid.to_raw());
        pretty_assertions::assert_eq!(framed.as_ref(), &expected[..]);
    }

    #[rstest]
    fn test_non_utf8_name_round_trips(oid: ObjectId) {
        let tree = Tree::new(vec![TreeRecord::new(
            EntryMode::File(FileMode::Regular),
            Bytes::from_static(b"caf\xe9.txt"), // latin-1, not valid UTF-8
            oid,
        )]);

        let framed = tree.serialize().unwrap();
        let parsed = crate::artifacts::objects::object::GitObject::deserialize(&framed).unwrap();
        pretty_assertions::assert_eq!(parsed.as_tree().unwrap(), &tree);
        pretty_assertions::assert_eq!(parsed.serialize().unwrap(), framed);
    }

    #[rstest]
    fn test_round_trip_preserves_order(oid: ObjectId) {
        // "zebra" stored before "apple": order is identity, not collation
        let tree = Tree::new(vec![
            TreeRecord::new(EntryMode::File(FileMode::Regular), "zebra".into(), oid.clone()),
            TreeRecord::new(EntryMode::Directory, "apple".into(), oid.clone()),
        ]);

        let framed = tree.serialize().unwrap();
        let parsed = crate::artifacts::objects::object::GitObject::deserialize(&framed).unwrap();
        pretty_assertions::assert_eq!(parsed.as_tree().unwrap(), &tree);
    }

    #[rstest]
    fn test_rejects_truncated_oid(oid: ObjectId) {
        let tree = Tree::new(vec![TreeRecord::new(
            EntryMode::File(FileMode::Regular),
            "a".into(),
            oid,
        )]);
        let framed = tree.serialize().unwrap();
        let body = &framed[8..framed.len() - 4]; // drop header and last oid bytes

        assert!(Tree::deserialize(Bytes::copy_from_slice(body)).is_err());
    }

    #[test]
    fn test_rejects_bad_mode() {
        assert!(Tree::deserialize(Bytes::from_static(b"100600 a\0aaaaaaaaaaaaaaaaaaaa")).is_err());
    }
}
