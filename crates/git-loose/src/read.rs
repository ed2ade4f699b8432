use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use git_hash::ObjectId;
use git_object::{header, ObjectError, ObjectType, Tree};

use crate::{LooseError, LooseObjectStore};

impl LooseObjectStore {
    /// Read an object's kind and payload.
    ///
    /// Fails with [`LooseError::NotFound`] when no file exists for `oid`, and
    /// with a corruption error when the file does not inflate or decode.
    pub fn get(&self, oid: &ObjectId) -> Result<(ObjectType, Vec<u8>), LooseError> {
        let compressed = match fs::read(self.object_path(oid)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LooseError::NotFound(*oid))
            }
            Err(e) => return Err(LooseError::Io(e)),
        };

        let mut framed = Vec::new();
        ZlibDecoder::new(&compressed[..])
            .read_to_end(&mut framed)
            .map_err(|source| LooseError::Decompress { oid: *oid, source })?;

        let (kind, _declared, header_len) =
            header::parse_header(&framed).map_err(|e| LooseError::Corrupt {
                oid: *oid,
                reason: e.to_string(),
            })?;
        framed.drain(..header_len);
        Ok((kind, framed))
    }

    /// Read and parse a tree object.
    pub fn read_tree(&self, oid: &ObjectId) -> Result<Tree, LooseError> {
        let (kind, payload) = self.get(oid)?;
        if kind != ObjectType::Tree {
            return Err(ObjectError::KindMismatch {
                expected: ObjectType::Tree,
                actual: kind,
            }
            .into());
        }
        Ok(Tree::parse(&payload)?)
    }
}
