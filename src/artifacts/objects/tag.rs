//! Annotated tag object
//!
//! ## Format
//!
//! ```text
//! object <target-oid>
//! type <target-kind>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message>
//! ```

use crate::artifacts::errors::ObjectError;
use crate::artifacts::objects::commit::{Author, parse_headers, write_header};
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;

/// A named, annotated pointer at another object
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tag {
    target: ObjectId,
    target_type: ObjectType,
    name: String,
    /// Absent in tags written by some ancient tools
    tagger: Option<Author>,
    message: String,
}

impl Tag {
    pub fn new(
        target: ObjectId,
        target_type: ObjectType,
        name: String,
        tagger: Option<Author>,
        message: String,
    ) -> Self {
        Tag {
            target,
            target_type,
            name,
            tagger,
            message,
        }
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> Option<&Author> {
        self.tagger.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn malformed(reason: impl Into<String>) -> anyhow::Error {
        ObjectError::MalformedBody {
            kind: "tag",
            reason: reason.into(),
        }
        .into()
    }
}

impl Packable for Tag {
    fn serialize(&self) -> Result<Bytes> {
        let mut body = String::new();

        write_header(&mut body, "object", self.target.as_ref());
        write_header(&mut body, "type", self.target_type.as_str());
        write_header(&mut body, "tag", &self.name);
        if let Some(tagger) = &self.tagger {
            write_header(&mut body, "tagger", &tagger.display());
        }
        body.push('\n');
        body.push_str(&self.message);

        Ok(frame(ObjectType::Tag, body.as_bytes()))
    }
}

impl Unpackable for Tag {
    fn deserialize(body: Bytes) -> Result<Self> {
        let text = std::str::from_utf8(&body).map_err(|_| Tag::malformed("non-UTF-8 body"))?;
        let (header_section, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Tag::malformed("missing blank line before message"))?;

        let mut headers = parse_headers(header_section)
            .map_err(|e| Tag::malformed(e.to_string()))?
            .into_iter();

        let (name, value) = headers.next().ok_or_else(|| Tag::malformed("empty header section"))?;
        if name != "object" {
            return Err(Tag::malformed(format!("expected object header, got {name:?}")));
        }
        let target = ObjectId::try_parse(value).map_err(|e| Tag::malformed(e.to_string()))?;

        let (name, value) = headers.next().ok_or_else(|| Tag::malformed("missing type header"))?;
        if name != "type" {
            return Err(Tag::malformed(format!("expected type header, got {name:?}")));
        }
        let target_type =
            ObjectType::try_from(value.as_str()).map_err(|e| Tag::malformed(e.to_string()))?;

        let (name, value) = headers.next().ok_or_else(|| Tag::malformed("missing tag header"))?;
        if name != "tag" {
            return Err(Tag::malformed(format!("expected tag header, got {name:?}")));
        }
        let tag_name = value;

        let tagger = match headers.next() {
            Some((name, value)) if name == "tagger" => Some(
                Author::try_from(value.as_str()).map_err(|e| Tag::malformed(e.to_string()))?,
            ),
            Some((name, _)) => {
                return Err(Tag::malformed(format!("unexpected header {name:?}")));
            }
            None => None,
        };

        Ok(Tag {
            target,
            target_type,
            name: tag_name,
            tagger,
            message: message.to_string(),
        })
    }
}

impl Object for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn display(&self) -> String {
        format!("tag {}\nobject {}\n\n{}", self.name, self.target, self.message)
    }
}
