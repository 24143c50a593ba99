//! The `packed-refs` text file
//!
//! Aggregates references into one line-oriented file so that a repository
//! does not need one loose file per ref. Three line kinds:
//!
//! ```text
//!                                  blank
//! # pack-refs with: peeled         comment
//! <40-hex> refs/heads/main         entry
//! ```
//!
//! Unparseable lines (for example `^<oid>` peel annotations) are skipped;
//! entry order is preserved.

use crate::artifacts::objects::object_id::ObjectId;
use bytes::Bytes;
use std::collections::BTreeSet;

/// One line of a packed-refs file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackedRefLine {
    Newline,
    Comment(String),
    Entry(ObjectId, String),
}

/// Parse the file, preserving line order and ignoring unparseable lines
pub fn parse(data: &[u8]) -> Vec<PackedRefLine> {
    let Ok(text) = std::str::from_utf8(data) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            lines.push(PackedRefLine::Newline);
        } else if let Some(comment) = line.strip_prefix('#') {
            lines.push(PackedRefLine::Comment(comment.to_string()));
        } else if let Some((hex, name)) = line.split_once(' ') {
            if let Ok(oid) = ObjectId::try_parse(hex) {
                lines.push(PackedRefLine::Entry(oid, name.to_string()));
            }
        }
    }

    lines
}

/// The first entry whose name matches, if any
pub fn find(lines: &[PackedRefLine], name: &str) -> Option<ObjectId> {
    lines.iter().find_map(|line| match line {
        PackedRefLine::Entry(oid, entry_name) if entry_name == name => Some(oid.clone()),
        _ => None,
    })
}

/// All reference names in the file
pub fn references(lines: &[PackedRefLine]) -> BTreeSet<String> {
    lines
        .iter()
        .filter_map(|line| match line {
            PackedRefLine::Entry(_, name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// Serialize lines back to the on-disk text form
pub fn serialize(lines: &[PackedRefLine]) -> Bytes {
    let mut out = String::new();
    for line in lines {
        match line {
            PackedRefLine::Newline => {}
            PackedRefLine::Comment(comment) => {
                out.push('#');
                out.push_str(comment);
            }
            PackedRefLine::Entry(oid, name) => {
                out.push_str(oid.as_ref());
                out.push(' ');
                out.push_str(name);
            }
        }
        out.push('\n');
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &[u8] = b"# pack-refs with: peeled fully-peeled sorted\n\
        ce013625030ba8dba906f756967f9e9ca394464a refs/heads/main\n\
        aab1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3 refs/tags/v1.0.0\n\
        ^ce013625030ba8dba906f756967f9e9ca394464a\n\
        \n";

    #[test]
    fn test_parse_line_kinds() {
        let lines = parse(SAMPLE);
        // the ^peel line is unparseable and skipped
        assert_eq!(lines.len(), 4);
        assert!(matches!(&lines[0], PackedRefLine::Comment(c) if c.starts_with(" pack-refs")));
        assert!(matches!(&lines[1], PackedRefLine::Entry(_, name) if name == "refs/heads/main"));
        assert!(matches!(&lines[3], PackedRefLine::Newline));
    }

    #[test]
    fn test_find_returns_first_match() {
        let lines = parse(SAMPLE);
        assert_eq!(
            find(&lines, "refs/heads/main").unwrap().to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
        assert_eq!(find(&lines, "refs/heads/missing"), None);
    }

    #[test]
    fn test_references_lists_entry_names() {
        let lines = parse(SAMPLE);
        let names = references(&lines);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["refs/heads/main".to_string(), "refs/tags/v1.0.0".to_string()]
        );
    }

    #[test]
    fn test_serialize_round_trip() {
        let lines = parse(SAMPLE);
        let serialized = serialize(&lines);
        assert_eq!(parse(&serialized), lines);
    }
}
