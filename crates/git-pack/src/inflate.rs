//! Inflating record payloads whose compressed length is not stored.
//!
//! A record's zlib stream is followed directly by the next record, so the
//! only way to find the boundary is to decompress and ask the inflater how
//! much input it took.

use flate2::{Decompress, FlushDecompress, Status};

use crate::PackError;

const CHUNK: usize = 32 * 1024;

/// Reusable zlib inflater for pack records.
pub struct Inflater {
    de: Decompress,
    buf: Box<[u8]>,
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            de: Decompress::new(true),
            buf: vec![0u8; CHUNK].into_boxed_slice(),
        }
    }

    /// Inflate one zlib stream from the start of `input`.
    ///
    /// The stream must produce exactly `expected` bytes. Returns the output
    /// and the number of compressed bytes consumed. `offset` is only used to
    /// label errors.
    pub fn inflate(
        &mut self,
        input: &[u8],
        expected: usize,
        offset: u64,
    ) -> Result<(Vec<u8>, usize), PackError> {
        let corrupt = |reason: String| PackError::CorruptEntry { offset, reason };

        self.de.reset(true);
        let mut out = Vec::with_capacity(expected.min(CHUNK * 32));
        let mut in_pos = 0usize;

        loop {
            let before_in = self.de.total_in();
            let before_out = self.de.total_out();
            let status = self
                .de
                .decompress(&input[in_pos..], &mut self.buf, FlushDecompress::None)
                .map_err(|e| corrupt(format!("zlib: {e}")))?;
            let consumed = (self.de.total_in() - before_in) as usize;
            let produced = (self.de.total_out() - before_out) as usize;
            in_pos += consumed;

            if out.len() + produced > expected {
                return Err(corrupt(format!("inflates past declared size {expected}")));
            }
            out.extend_from_slice(&self.buf[..produced]);

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if consumed == 0 && produced == 0 {
                        return Err(if in_pos >= input.len() {
                            PackError::Truncated(format!(
                                "zlib stream at offset {offset} ends early"
                            ))
                        } else {
                            corrupt("zlib stream stalled".to_string())
                        });
                    }
                }
            }
        }

        if out.len() != expected {
            return Err(corrupt(format!(
                "declared size {expected}, inflated {}",
                out.len()
            )));
        }
        Ok((out, in_pos))
    }
}

/// One-shot form of [`Inflater::inflate`].
pub fn inflate_entry(
    input: &[u8],
    expected: usize,
    offset: u64,
) -> Result<(Vec<u8>, usize), PackError> {
    Inflater::new().inflate(input, expected, offset)
}
