//! Commit object
//!
//! ## Format
//!
//! ```text
//! tree <tree-oid>
//! parent <parent-oid>        (zero or more)
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! gpgsig <signature...>      (optional, continuation lines)
//!
//! <message>
//! ```
//!
//! Extra headers after `committer` (gpgsig, mergetag, encoding, ...) are
//! preserved verbatim so that re-serializing a parsed commit reproduces
//! the original bytes, and with them the original hash. The message is
//! kept byte-exact, trailing newline included.

use crate::artifacts::errors::ObjectError;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};

/// Author or committer identity with timestamp
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: DateTime<FixedOffset>,
}

impl Author {
    pub fn new(name: String, email: String, timestamp: DateTime<FixedOffset>) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// The wire form: `Name <email> <unix-seconds> <±HHMM>`
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }
}

/// Parse a git timezone offset, `±HHMM` without a colon
fn parse_timezone(tz: &str) -> Result<FixedOffset> {
    let bytes = tz.as_bytes();
    if bytes.len() != 5 || (bytes[0] != b'+' && bytes[0] != b'-') {
        anyhow::bail!("invalid timezone {tz:?}");
    }
    let hours: i32 = tz[1..3].parse().map_err(|_| anyhow::anyhow!("invalid timezone {tz:?}"))?;
    let minutes: i32 = tz[3..5].parse().map_err(|_| anyhow::anyhow!("invalid timezone {tz:?}"))?;

    let seconds = hours * 3600 + minutes * 60;
    let offset = if bytes[0] == b'-' {
        FixedOffset::west_opt(seconds)
    } else {
        FixedOffset::east_opt(seconds)
    };
    offset.ok_or_else(|| anyhow::anyhow!("timezone {tz:?} out of range"))
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        // Split from the right: timezone, timestamp, then "name <email>"
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            anyhow::bail!("invalid author format {value:?}");
        }

        let offset = parse_timezone(parts[0])?;
        let seconds: i64 = parts[1]
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timestamp {:?}", parts[1]))?;
        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| anyhow::anyhow!("timestamp {seconds} out of range"))?
            .with_timezone(&offset);

        let name_email = parts[2];
        let open = name_email
            .find('<')
            .ok_or_else(|| anyhow::anyhow!("author missing '<'"))?;
        let close = name_email
            .find('>')
            .ok_or_else(|| anyhow::anyhow!("author missing '>'"))?;

        Ok(Author {
            name: name_email[..open].trim_end().to_string(),
            email: name_email[open + 1..close].to_string(),
            timestamp,
        })
    }
}

/// A snapshot of the repository with its ancestry and authorship
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    tree_oid: ObjectId,
    parents: Vec<ObjectId>,
    author: Author,
    committer: Author,
    /// Headers after `committer`, e.g. `gpgsig` or `mergetag`, preserved
    /// with their multi-line values intact
    extra_headers: Vec<(String, String)>,
    message: String,
}

impl Commit {
    pub fn new(
        tree_oid: ObjectId,
        parents: Vec<ObjectId>,
        author: Author,
        committer: Author,
        message: String,
    ) -> Self {
        Commit {
            tree_oid,
            parents,
            author,
            committer,
            extra_headers: Vec::new(),
            message,
        }
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn extra_headers(&self) -> &[(String, String)] {
        &self.extra_headers
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn malformed(reason: impl Into<String>) -> anyhow::Error {
        ObjectError::MalformedBody {
            kind: "commit",
            reason: reason.into(),
        }
        .into()
    }
}

/// Split a header section into `(name, value)` pairs, folding
/// space-prefixed continuation lines into the previous value
pub(crate) fn parse_headers(section: &str) -> Result<Vec<(String, String)>> {
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in section.split('\n') {
        if let Some(continuation) = line.strip_prefix(' ') {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| anyhow::anyhow!("continuation line without header"))?;
            value.push('\n');
            value.push_str(continuation);
        } else {
            let (name, value) = line
                .split_once(' ')
                .ok_or_else(|| anyhow::anyhow!("header line {line:?} missing value"))?;
            headers.push((name.to_string(), value.to_string()));
        }
    }

    Ok(headers)
}

/// Write a header whose value may span lines; each extra line is prefixed
/// with a space (the continuation marker)
pub(crate) fn write_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push(' ');
    let mut lines = value.split('\n');
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push(' ');
        out.push_str(line);
    }
    out.push('\n');
}

impl Packable for Commit {
    fn serialize(&self) -> Result<Bytes> {
        let mut body = String::new();

        write_header(&mut body, "tree", self.tree_oid.as_ref());
        for parent in &self.parents {
            write_header(&mut body, "parent", parent.as_ref());
        }
        write_header(&mut body, "author", &self.author.display());
        write_header(&mut body, "committer", &self.committer.display());
        for (name, value) in &self.extra_headers {
            write_header(&mut body, name, value);
        }
        body.push('\n');
        body.push_str(&self.message);

        Ok(frame(ObjectType::Commit, body.as_bytes()))
    }
}

impl Unpackable for Commit {
    fn deserialize(body: Bytes) -> Result<Self> {
        let text = std::str::from_utf8(&body).map_err(|_| Commit::malformed("non-UTF-8 body"))?;
        let (header_section, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Commit::malformed("missing blank line before message"))?;

        let mut headers = parse_headers(header_section)
            .map_err(|e| Commit::malformed(e.to_string()))?
            .into_iter();

        let (name, value) = headers.next().ok_or_else(|| Commit::malformed("empty header section"))?;
        if name != "tree" {
            return Err(Commit::malformed(format!("expected tree header, got {name:?}")));
        }
        let tree_oid = ObjectId::try_parse(value).map_err(|e| Commit::malformed(e.to_string()))?;

        let mut parents = Vec::new();
        let mut next = headers.next();
        while let Some((name, value)) = &next {
            if name != "parent" {
                break;
            }
            parents.push(ObjectId::try_parse(value.clone()).map_err(|e| Commit::malformed(e.to_string()))?);
            next = headers.next();
        }

        let (name, value) = next.ok_or_else(|| Commit::malformed("missing author header"))?;
        if name != "author" {
            return Err(Commit::malformed(format!("expected author header, got {name:?}")));
        }
        let author = Author::try_from(value.as_str())
            .with_context(|| format!("author {value:?}"))
            .map_err(|e| Commit::malformed(e.to_string()))?;

        let (name, value) = headers.next().ok_or_else(|| Commit::malformed("missing committer header"))?;
        if name != "committer" {
            return Err(Commit::malformed(format!("expected committer header, got {name:?}")));
        }
        let committer = Author::try_from(value.as_str())
            .with_context(|| format!("committer {value:?}"))
            .map_err(|e| Commit::malformed(e.to_string()))?;

        let extra_headers = headers.collect();

        Ok(Commit {
            tree_oid,
            parents,
            author,
            committer,
            extra_headers,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        let framed = self.serialize().unwrap_or_default();
        match crate::artifacts::objects::object::parse_header(&framed) {
            Ok((_, _, consumed)) => String::from_utf8_lossy(&framed[consumed..]).into_owned(),
            Err(_) => String::new(),
        }
    }
}
