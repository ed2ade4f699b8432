//! Object framing: `"<kind> <len>\0" + payload`.

use git_hash::{Hasher, ObjectId};

use crate::{ObjectError, ObjectType};

/// Build the header `"<kind> <len>\0"`.
pub fn write_header(kind: ObjectType, payload_len: usize) -> Vec<u8> {
    format!("{} {}\0", kind, payload_len).into_bytes()
}

/// Parse a header at the start of `data`.
///
/// Returns `(kind, declared_len, header_len)`; `header_len` includes the NUL.
pub fn parse_header(data: &[u8]) -> Result<(ObjectType, usize, usize), ObjectError> {
    let space = data
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::InvalidHeader("missing space after kind".into()))?;
    let nul = data[space + 1..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| p + space + 1)
        .ok_or_else(|| ObjectError::InvalidHeader("missing NUL terminator".into()))?;

    let kind = ObjectType::from_bytes(&data[..space])?;
    let len_bytes = &data[space + 1..nul];
    if len_bytes.is_empty() || !len_bytes.iter().all(u8::is_ascii_digit) {
        return Err(ObjectError::InvalidHeader(format!(
            "invalid size: {}",
            String::from_utf8_lossy(len_bytes)
        )));
    }
    let declared = std::str::from_utf8(len_bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ObjectError::InvalidHeader("size out of range".into()))?;

    Ok((kind, declared, nul + 1))
}

/// Frame `payload` and compute its id.
pub fn encode(kind: ObjectType, payload: &[u8]) -> Result<(ObjectId, Vec<u8>), ObjectError> {
    let mut framed = write_header(kind, payload.len());
    framed.extend_from_slice(payload);
    let id = Hasher::digest(&framed)?;
    Ok((id, framed))
}

/// Split framed bytes into kind and payload.
///
/// The declared length is informational: everything after the NUL is the
/// payload.
pub fn decode(framed: &[u8]) -> Result<(ObjectType, &[u8]), ObjectError> {
    let (kind, _declared, header_len) = parse_header(framed)?;
    Ok((kind, &framed[header_len..]))
}

/// Compute the id `payload` would have as an object of `kind`, without framing a copy.
pub fn hash_object(kind: ObjectType, payload: &[u8]) -> Result<ObjectId, ObjectError> {
    Ok(Hasher::hash_object(kind.as_str(), payload)?)
}
