//! Loose object storage.
//!
//! Each object lives at `objects/XX/YYYY...` where `XX` is the first byte
//! of its id in hex and `YYYY...` the rest. The file holds the
//! zlib-compressed framed bytes `"<kind> <len>\0<payload>"`.

mod read;
mod snapshot;
mod write;

use std::path::{Path, PathBuf};

use git_hash::ObjectId;

/// The `objects/` directory of a repository.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    objects_dir: PathBuf,
    compression_level: flate2::Compression,
}

impl LooseObjectStore {
    /// Open the store rooted at `objects_dir`. Nothing is created until the first write.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
            compression_level: flate2::Compression::default(),
        }
    }

    /// Set the zlib compression level (0-9).
    pub fn set_compression_level(&mut self, level: u32) {
        self.compression_level = flate2::Compression::new(level);
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_dir.join(oid.shard()).join(oid.shard_file())
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).is_file()
    }
}

/// Errors from loose object operations.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("object {0} not found")]
    NotFound(ObjectId),

    #[error("corrupt loose object {oid}: {reason}")]
    Corrupt { oid: ObjectId, reason: String },

    #[error("decompression error for {oid}: {source}")]
    Decompress {
        oid: ObjectId,
        #[source]
        source: std::io::Error,
    },

    #[error("directory loop at {path}")]
    CircularStructure { path: PathBuf },

    #[error("{path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("object parse error: {0}")]
    Object(#[from] git_object::ObjectError),

    #[error("hash error: {0}")]
    Hash(#[from] git_hash::HashError),
}
