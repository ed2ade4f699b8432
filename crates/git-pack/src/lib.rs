//! Packfile decoding for mgit.
//!
//! A packfile bundles many objects, some stored whole and some as deltas
//! against another object. [`unpack`] walks a complete pack held in
//! memory, inflates each record, reconstructs deltas, and writes every
//! resulting object into a [`git_loose::LooseObjectStore`].

pub mod delta;
pub mod entry;
pub mod inflate;
mod unpack;

pub use unpack::{unpack, UnpackOptions, UnpackSummary};

use git_hash::ObjectId;
use git_object::ObjectType;

/// Pack signature bytes.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";

/// Size of the fixed pack header: signature, version, object count.
pub const PACK_HEADER_SIZE: usize = 12;

/// Size of the trailing SHA-1 over everything before it.
pub const PACK_TRAILER_SIZE: usize = 20;

/// Errors that can occur while decoding a pack.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("pack truncated: {0}")]
    Truncated(String),

    #[error("pack checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: ObjectId, actual: ObjectId },

    #[error("invalid delta at offset {offset}: {reason}")]
    InvalidDelta { offset: u64, reason: String },

    #[error("{count} delta(s) could not be resolved; first missing base: {missing}")]
    UnresolvedDeltas { count: usize, missing: String },

    #[error(transparent)]
    Loose(#[from] git_loose::LooseError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] git_hash::HashError),
}

/// Type of a packed object record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta against the record starting at `base_offset` in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta against the object named `base_oid`.
    RefDelta { base_oid: ObjectId },
}

impl PackEntryType {
    /// The object kind of a whole (non-delta) record.
    pub fn to_object_type(self) -> Option<ObjectType> {
        match self {
            Self::Commit => Some(ObjectType::Commit),
            Self::Tree => Some(ObjectType::Tree),
            Self::Blob => Some(ObjectType::Blob),
            Self::Tag => Some(ObjectType::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }

    /// Type number as written in record headers.
    pub fn type_number(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
            Self::OfsDelta { .. } => 6,
            Self::RefDelta { .. } => 7,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, Self::OfsDelta { .. } | Self::RefDelta { .. })
    }
}

impl From<ObjectType> for PackEntryType {
    fn from(kind: ObjectType) -> Self {
        match kind {
            ObjectType::Commit => Self::Commit,
            ObjectType::Tree => Self::Tree,
            ObjectType::Blob => Self::Blob,
            ObjectType::Tag => Self::Tag,
        }
    }
}
