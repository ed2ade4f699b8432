use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use git_hash::ObjectId;
use git_object::{header, ObjectType};
use tracing::trace;

use crate::{LooseError, LooseObjectStore};

impl LooseObjectStore {
    /// Store `payload` as an object of `kind` and return its id.
    ///
    /// Idempotent: if the object file already exists nothing is written and
    /// the existing file is trusted. Only the object's own shard directory
    /// is created.
    pub fn put(&self, kind: ObjectType, payload: &[u8]) -> Result<ObjectId, LooseError> {
        let hdr = header::write_header(kind, payload.len());
        let oid = header::hash_object(kind, payload)?;

        let final_path = self.object_path(&oid);
        if final_path.is_file() {
            trace!(%oid, %kind, "object already present");
            return Ok(oid);
        }

        let shard = self.objects_dir.join(oid.shard());
        fs::create_dir_all(&shard)?;

        let tmp = compress_to_temp(&shard, &hdr, payload, self.compression_level)?;
        finalize_object(tmp, &final_path)?;
        trace!(%oid, %kind, size = payload.len(), "wrote loose object");
        Ok(oid)
    }
}

/// Compress framed bytes into a temp file next to the final location.
fn compress_to_temp(
    dir: &Path,
    hdr: &[u8],
    payload: &[u8],
    level: flate2::Compression,
) -> Result<tempfile::NamedTempFile, LooseError> {
    let tmp = tempfile::Builder::new().prefix("tmp_obj_").tempfile_in(dir)?;
    let mut encoder = ZlibEncoder::new(tmp, level);
    encoder.write_all(hdr)?;
    encoder.write_all(payload)?;
    let tmp = encoder.finish()?;

    // Read-only, matching git.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o444))?;
    }

    Ok(tmp)
}

/// Move the temp file into place.
///
/// Losing a rename race to another writer of the same id is success: the
/// content is identical by construction.
fn finalize_object(tmp: tempfile::NamedTempFile, final_path: &Path) -> Result<(), LooseError> {
    match tmp.persist(final_path) {
        Ok(_) => Ok(()),
        Err(_) if final_path.is_file() => Ok(()),
        Err(e) => Err(LooseError::Io(e.error)),
    }
}
