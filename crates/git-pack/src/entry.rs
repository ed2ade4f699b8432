//! Pack record headers.
//!
//! ```text
//! byte 0:   [C TTT SSSS]   C = more size bytes follow, T = type, S = size bits 0-3
//! byte 1..: [C SSSSSSS]    size bits 4-10, 11-17, ... (little-endian base-128)
//! ```
//!
//! An OFS_DELTA record is followed by a big-endian base-128 distance back to
//! its base record, where every continuation adds one before shifting. A
//! REF_DELTA record is followed by the 20 raw bytes of its base id.

use git_hash::{ObjectId, DIGEST_LEN};

use crate::{PackEntryType, PackError};

/// A parsed record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    pub entry_type: PackEntryType,
    /// Inflated size of the record's payload (for deltas, of the delta stream).
    pub size: usize,
    /// Absolute offset of the record's first header byte.
    pub offset: u64,
    /// Bytes taken by the header, including any delta base reference.
    pub header_len: usize,
}

impl PackEntry {
    /// Absolute offset where the zlib stream begins.
    pub fn data_offset(&self) -> u64 {
        self.offset + self.header_len as u64
    }
}

fn corrupt(offset: u64, reason: &str) -> PackError {
    PackError::CorruptEntry {
        offset,
        reason: reason.to_string(),
    }
}

/// Parse the record header at the start of `data`.
///
/// `offset` is the record's absolute position in the pack, needed to turn
/// an OFS_DELTA distance into an absolute base offset.
pub fn parse_entry_header(data: &[u8], offset: u64) -> Result<PackEntry, PackError> {
    let mut bytes = data.iter().copied();
    let mut pos = 0usize;
    let mut next = |what: &str| {
        let b = bytes.next().ok_or_else(|| corrupt(offset, what))?;
        pos += 1;
        Ok::<u8, PackError>(b)
    };

    let first = next("empty record header")?;
    let type_num = (first >> 4) & 0x07;
    let mut size = u64::from(first & 0x0f);
    let mut shift = 4u32;
    let mut byte = first;
    while byte & 0x80 != 0 {
        byte = next("truncated size")?;
        if shift > 57 {
            return Err(corrupt(offset, "size does not fit in 64 bits"));
        }
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }

    let entry_type = match type_num {
        1 => PackEntryType::Commit,
        2 => PackEntryType::Tree,
        3 => PackEntryType::Blob,
        4 => PackEntryType::Tag,
        6 => {
            let mut c = next("truncated base distance")?;
            let mut distance = u64::from(c & 0x7f);
            while c & 0x80 != 0 {
                c = next("truncated base distance")?;
                distance = distance
                    .checked_add(1)
                    .and_then(|d| d.checked_mul(128))
                    .and_then(|d| d.checked_add(u64::from(c & 0x7f)))
                    .ok_or_else(|| corrupt(offset, "base distance overflow"))?;
            }
            if distance == 0 || distance > offset {
                return Err(corrupt(offset, "base distance points outside the pack"));
            }
            PackEntryType::OfsDelta {
                base_offset: offset - distance,
            }
        }
        7 => {
            let mut raw = [0u8; DIGEST_LEN];
            for slot in raw.iter_mut() {
                *slot = next("truncated base id")?;
            }
            PackEntryType::RefDelta {
                base_oid: ObjectId::from(raw),
            }
        }
        other => return Err(corrupt(offset, &format!("unknown record type {other}"))),
    };

    let size = usize::try_from(size).map_err(|_| corrupt(offset, "size too large"))?;
    Ok(PackEntry {
        entry_type,
        size,
        offset,
        header_len: pos,
    })
}

/// Encode a record header (type and size only).
///
/// Delta records need their base reference appended by the caller.
pub fn encode_entry_header(type_num: u8, size: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    let mut s = size;
    let mut c = (type_num << 4) | (s & 0x0f) as u8;
    s >>= 4;
    while s > 0 {
        buf.push(c | 0x80);
        c = (s & 0x7f) as u8;
        s >>= 7;
    }
    buf.push(c);
    buf
}

/// Encode an OFS_DELTA distance.
pub fn encode_ofs_distance(distance: u64) -> Vec<u8> {
    let mut buf = vec![(distance & 0x7f) as u8];
    let mut d = distance >> 7;
    while d > 0 {
        d -= 1;
        buf.push(0x80 | (d & 0x7f) as u8);
        d >>= 7;
    }
    buf.reverse();
    buf
}
