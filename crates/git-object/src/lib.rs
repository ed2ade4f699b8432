//! Git object model for mgit.
//!
//! Objects are framed as `"<kind> <len>\0" + payload` and named by the
//! SHA-1 of the framed bytes. This crate owns that framing ([`header`]),
//! the binary tree layout ([`Tree`]) and commit construction
//! ([`CommitBuilder`]).

mod commit;
pub mod header;
mod tree;

pub use commit::{commit_tree, CommitBuilder, GitDate, Identity, Signature};
pub use header::{decode, encode, hash_object};
pub use tree::{FileMode, Tree, TreeEntry};

use bstr::BString;
use git_hash::HashError;

/// Errors produced by object operations.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object type: {0}")]
    InvalidType(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("invalid tree entry at offset {offset}: {reason}")]
    InvalidTreeEntry { offset: usize, reason: String },

    #[error("invalid file mode: {0}")]
    InvalidFileMode(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("expected a {expected} object, found {actual}")]
    KindMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The kinds of object mgit reads and writes.
///
/// `Tag` is never produced locally; it only arrives inside packfiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    /// Parse the kind name used in object headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidType(BString::from(s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}
