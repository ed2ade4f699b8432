//! Reconstruct a target object from a base and a delta stream.

use super::{DeltaStream, Instruction};
use crate::PackError;

/// Upper bound on the up-front allocation for a target, whatever the
/// delta header claims.
const MAX_PREALLOC: usize = 16 << 20;

/// Apply `delta` to `base`.
///
/// The delta's source size must equal `base.len()`, every copy must lie
/// inside `base`, and the output must come to exactly the target size.
/// Error offsets are byte positions within `delta`.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, PackError> {
    let mut stream = DeltaStream::new(delta)?;
    let target_size = stream.target_size;

    if stream.source_size != base.len() {
        return Err(PackError::InvalidDelta {
            offset: 0,
            reason: format!(
                "source size mismatch: delta expects {}, base is {}",
                stream.source_size,
                base.len()
            ),
        });
    }

    let mut out = Vec::with_capacity(target_size.min(MAX_PREALLOC));
    loop {
        let at = stream.position() as u64;
        let Some(instruction) = stream.next() else {
            break;
        };
        let bytes = match instruction? {
            Instruction::Copy { offset, size } => offset
                .checked_add(size)
                .and_then(|end| base.get(offset..end))
                .ok_or_else(|| PackError::InvalidDelta {
                    offset: at,
                    reason: format!(
                        "copy {offset}+{size} out of bounds for base of {} bytes",
                        base.len()
                    ),
                })?,
            Instruction::Insert(data) => data,
        };
        if out.len() + bytes.len() > target_size {
            return Err(PackError::InvalidDelta {
                offset: at,
                reason: format!("output exceeds target size {target_size}"),
            });
        }
        out.extend_from_slice(bytes);
    }

    if out.len() != target_size {
        return Err(PackError::InvalidDelta {
            offset: delta.len() as u64,
            reason: format!(
                "target size mismatch: expected {target_size}, produced {}",
                out.len()
            ),
        });
    }
    Ok(out)
}
