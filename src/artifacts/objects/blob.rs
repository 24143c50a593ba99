//! Blob object
//!
//! Blobs carry raw file content. Everything else about a file (name, mode)
//! lives in the trees that reference it.

use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use derive_new::new;

/// An opaque byte sequence, identified by its hash
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Packable for Blob {
    fn serialize(&self) -> Result<Bytes> {
        Ok(frame(ObjectType::Blob, &self.content))
    }
}

impl Unpackable for Blob {
    fn deserialize(body: Bytes) -> Result<Self> {
        Ok(Blob::new(body))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}
