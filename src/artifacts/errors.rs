//! Error taxonomy for the object database
//!
//! Each layer surfaces its failures through these enums, wrapped in
//! `anyhow::Error` at the call sites. Callers that need to react to a
//! specific failure (e.g. an ambiguous short hash) downcast to the enum.

use thiserror::Error;

/// Failures while decoding or encoding an object
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    /// The `<kind> SP <size> NUL` framing could not be parsed
    #[error("malformed object header: {0}")]
    MalformedHeader(String),

    /// The declared size does not match the payload length
    #[error("object size mismatch: header declares {declared} bytes, payload has {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    /// The kind-specific body parser failed
    #[error("malformed {kind} body: {reason}")]
    MalformedBody { kind: &'static str, reason: String },

    /// The zlib stream could not be inflated
    #[error("malformed zlib stream")]
    MalformedCompression,
}

/// Failures at the store surface
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// `read_exn` on a hash absent from both tiers
    #[error("object {0} not found")]
    NotFound(String),

    /// A short hash matched more than one stored object
    #[error("short hash {0} is ambiguous")]
    Ambiguous(String),

    /// Invalid construction-time configuration
    #[error("invalid store configuration: {0}")]
    ConfigError(String),
}

/// Failures in the reference layer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    /// A symbolic-reference chain did not terminate within the chase bound
    #[error("reference {0} does not resolve: symbolic chain too deep or cyclic")]
    MalformedReference(String),

    /// `read_reference_exn` on an absent reference
    #[error("reference {0} not found")]
    NotFound(String),
}

/// Failures while materializing a commit onto the filesystem
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// A tree entry resolved to an object of the wrong kind
    #[error("object {oid} is a {actual}, expected a {expected}")]
    SchemaViolation {
        oid: String,
        expected: &'static str,
        actual: &'static str,
    },
}
