use std::collections::{HashMap, HashSet};

use git_hash::{Hasher, ObjectId};
use git_loose::LooseObjectStore;
use git_object::ObjectType;
use tracing::{debug, trace};

use crate::delta::apply_delta;
use crate::entry::parse_entry_header;
use crate::inflate::Inflater;
use crate::{PackEntryType, PackError, PACK_HEADER_SIZE, PACK_SIGNATURE, PACK_TRAILER_SIZE};

/// Knobs for [`unpack`].
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Check the trailing SHA-1 against the pack contents before storing anything.
    pub verify_checksum: bool,
}

/// What [`unpack`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Records in the pack, as declared by its header.
    pub objects: usize,
    /// How many of those were deltas.
    pub deltas: usize,
    /// Ids of every stored object, in the order they were written.
    pub stored_ids: Vec<ObjectId>,
}

/// The fixed 12-byte pack header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    pub version: u32,
    pub object_count: u32,
}

impl PackHeader {
    pub fn parse(data: &[u8]) -> Result<Self, PackError> {
        if data.len() < PACK_HEADER_SIZE {
            return Err(PackError::Truncated(format!(
                "{} bytes, need at least {PACK_HEADER_SIZE} for the header",
                data.len()
            )));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader(format!(
                "bad signature {:02x?}",
                &data[0..4]
            )));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != 2 && version != 3 {
            return Err(PackError::UnsupportedVersion(version));
        }
        let object_count = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        Ok(Self {
            version,
            object_count,
        })
    }
}

enum Base {
    Offset(u64),
    Id(ObjectId),
}

struct PendingDelta {
    offset: u64,
    base: Base,
    delta: Vec<u8>,
}

/// Decode a complete pack and write every object into `store`.
///
/// The header's object count is exact: the last declared record must be
/// followed by the 20-byte trailer and nothing else.
///
/// Nothing is written until every record has been inflated and the trailer
/// checked. Whole records are then stored, and deltas are resolved round
/// after round until none are left or a round makes no progress. OFS_DELTA bases come from this pack; REF_DELTA bases
/// may be any object already in `store`.
pub fn unpack(
    data: &[u8],
    store: &LooseObjectStore,
    options: &UnpackOptions,
) -> Result<UnpackSummary, PackError> {
    let header = PackHeader::parse(data)?;
    debug!(
        version = header.version,
        objects = header.object_count,
        bytes = data.len(),
        "unpacking pack"
    );

    let count = header.object_count as usize;
    let mut summary = UnpackSummary {
        objects: count,
        ..Default::default()
    };
    let mut resolved: HashMap<u64, (ObjectType, ObjectId)> = HashMap::new();
    let mut record_offsets = HashSet::with_capacity(count);
    let mut whole = Vec::new();
    let mut pending = Vec::new();
    let mut inflater = Inflater::new();

    let mut pos = PACK_HEADER_SIZE;
    for index in 0..count {
        if pos >= data.len() {
            return Err(PackError::Truncated(format!(
                "header declares {count} objects, data ends after {index}"
            )));
        }
        let offset = pos as u64;
        let entry = parse_entry_header(&data[pos..], offset)?;
        let start = pos + entry.header_len;
        let (payload, used) = inflater.inflate(&data[start..], entry.size, offset)?;
        pos = start + used;
        record_offsets.insert(offset);
        trace!(offset, kind = ?entry.entry_type, size = entry.size, "record");

        let kind = match entry.entry_type {
            PackEntryType::OfsDelta { base_offset } => {
                pending.push(PendingDelta {
                    offset,
                    base: Base::Offset(base_offset),
                    delta: payload,
                });
                continue;
            }
            PackEntryType::RefDelta { base_oid } => {
                pending.push(PendingDelta {
                    offset,
                    base: Base::Id(base_oid),
                    delta: payload,
                });
                continue;
            }
            PackEntryType::Commit => ObjectType::Commit,
            PackEntryType::Tree => ObjectType::Tree,
            PackEntryType::Blob => ObjectType::Blob,
            PackEntryType::Tag => ObjectType::Tag,
        };
        whole.push((offset, kind, payload));
    }

    let remaining = data.len() - pos;
    if remaining < PACK_TRAILER_SIZE {
        return Err(PackError::Truncated(format!(
            "{remaining} bytes left after the last object, need {PACK_TRAILER_SIZE} for the trailer"
        )));
    }
    if remaining > PACK_TRAILER_SIZE {
        return Err(PackError::CorruptEntry {
            offset: pos as u64,
            reason: format!(
                "{} bytes after the last declared object ({count} declared)",
                remaining - PACK_TRAILER_SIZE
            ),
        });
    }
    if options.verify_checksum {
        verify_trailer(data)?;
    }

    for delta in &pending {
        if let Base::Offset(base_offset) = delta.base {
            if !record_offsets.contains(&base_offset) {
                return Err(PackError::CorruptEntry {
                    offset: delta.offset,
                    reason: format!("base offset {base_offset} is not the start of a record"),
                });
            }
        }
    }

    for (offset, kind, payload) in whole {
        let oid = store.put(kind, &payload)?;
        resolved.insert(offset, (kind, oid));
        summary.stored_ids.push(oid);
    }

    summary.deltas = pending.len();
    resolve_deltas(pending, store, &mut resolved, &mut summary.stored_ids)?;

    debug!(
        objects = summary.objects,
        deltas = summary.deltas,
        "pack unpacked"
    );
    Ok(summary)
}

fn verify_trailer(data: &[u8]) -> Result<(), PackError> {
    if data.len() < PACK_HEADER_SIZE + PACK_TRAILER_SIZE {
        return Err(PackError::Truncated("no room for the trailer".to_string()));
    }
    let split = data.len() - PACK_TRAILER_SIZE;
    let expected = ObjectId::from_bytes(&data[split..])?;
    let actual = Hasher::digest(&data[..split])?;
    if expected != actual {
        return Err(PackError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

fn resolve_deltas(
    mut pending: Vec<PendingDelta>,
    store: &LooseObjectStore,
    resolved: &mut HashMap<u64, (ObjectType, ObjectId)>,
    stored_ids: &mut Vec<ObjectId>,
) -> Result<(), PackError> {
    let mut round = 0usize;
    while !pending.is_empty() {
        round += 1;
        let before = pending.len();
        let mut waiting = Vec::new();

        for delta in pending {
            let base = match &delta.base {
                Base::Offset(base_offset) => match resolved.get(base_offset) {
                    Some(&(kind, oid)) => Some((kind, store.get(&oid)?.1)),
                    None => None,
                },
                Base::Id(oid) if store.contains(oid) => Some(store.get(oid)?),
                Base::Id(_) => None,
            };
            let Some((kind, base_bytes)) = base else {
                waiting.push(delta);
                continue;
            };

            let target = apply_delta(&base_bytes, &delta.delta).map_err(|e| match e {
                PackError::InvalidDelta { offset, reason } => PackError::InvalidDelta {
                    offset: delta.offset,
                    reason: format!("{reason} (delta byte {offset})"),
                },
                other => other,
            })?;
            let oid = store.put(kind, &target)?;
            resolved.insert(delta.offset, (kind, oid));
            stored_ids.push(oid);
        }

        trace!(round, resolved = before - waiting.len(), left = waiting.len(), "delta round");
        if waiting.len() == before {
            let missing = match &waiting[0].base {
                Base::Offset(o) => format!("record at offset {o}"),
                Base::Id(oid) => oid.to_hex(),
            };
            return Err(PackError::UnresolvedDeltas {
                count: waiting.len(),
                missing,
            });
        }
        pending = waiting;
    }
    Ok(())
}
