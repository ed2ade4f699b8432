//! Delta instruction streams.
//!
//! ```text
//! [source_size: varint] [target_size: varint] [instruction]*
//! ```
//!
//! Both sizes are uniform little-endian base-128 varints. Instructions:
//! - Copy:   `[1SSSOOOO] [offset bytes] [size bytes]`
//! - Insert: `[0NNNNNNN] [N literal bytes]`, N in 1..=127
//!
//! Parsing goes through a [`Cursor`] over the immutable delta buffer; no
//! intermediate copies are made for insert payloads.

pub mod apply;

pub use apply::apply_delta;

use crate::PackError;

/// Copy size used when a copy instruction carries no size bytes.
pub const MAX_COPY_SIZE: usize = 0x10000;

/// Longest literal run a single insert instruction can carry.
pub const MAX_INSERT_SIZE: usize = 0x7f;

/// One decoded delta instruction, borrowing from the delta buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// Append `base[offset..offset + size]`.
    Copy { offset: usize, size: usize },
    /// Append the literal bytes.
    Insert(&'a [u8]),
}

/// Read position over a delta buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn error(&self, reason: impl Into<String>) -> PackError {
        PackError::InvalidDelta {
            offset: self.pos as u64,
            reason: reason.into(),
        }
    }

    pub fn byte(&mut self, what: &str) -> Result<u8, PackError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.error(format!("truncated {what}")))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], PackError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.error(format!("truncated {what}")))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Uniform little-endian base-128 varint.
    pub fn varint(&mut self, what: &str) -> Result<usize, PackError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let b = self.byte(what)?;
            if shift > 63 {
                return Err(self.error(format!("{what} does not fit in 64 bits")));
            }
            value |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        usize::try_from(value).map_err(|_| self.error(format!("{what} too large")))
    }

    /// Little-endian integer made of the bytes whose bits are set in `mask`.
    fn sparse(&mut self, mask: u8, bytes: u32, what: &str) -> Result<usize, PackError> {
        let mut value = 0usize;
        for i in 0..bytes {
            if mask & (1 << i) != 0 {
                value |= usize::from(self.byte(what)?) << (8 * i);
            }
        }
        Ok(value)
    }

    /// Decode the instruction at the cursor.
    pub fn instruction(&mut self) -> Result<Instruction<'a>, PackError> {
        let start = self.pos;
        let op = self.byte("instruction")?;
        if op & 0x80 != 0 {
            let offset = self.sparse(op & 0x0f, 4, "copy offset")?;
            let size = match self.sparse((op >> 4) & 0x07, 3, "copy size")? {
                0 => MAX_COPY_SIZE,
                n => n,
            };
            Ok(Instruction::Copy { offset, size })
        } else if op != 0 {
            Ok(Instruction::Insert(self.take(usize::from(op), "insert data")?))
        } else {
            Err(PackError::InvalidDelta {
                offset: start as u64,
                reason: "reserved opcode 0".into(),
            })
        }
    }
}

/// A delta stream with its size header already read.
#[derive(Debug, Clone)]
pub struct DeltaStream<'a> {
    pub source_size: usize,
    pub target_size: usize,
    cursor: Cursor<'a>,
}

impl<'a> DeltaStream<'a> {
    pub fn new(delta: &'a [u8]) -> Result<Self, PackError> {
        let mut cursor = Cursor::new(delta);
        let source_size = cursor.varint("source size")?;
        let target_size = cursor.varint("target size")?;
        Ok(Self {
            source_size,
            target_size,
            cursor,
        })
    }

    /// Position of the next unread instruction byte.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }
}

impl<'a> Iterator for DeltaStream<'a> {
    type Item = Result<Instruction<'a>, PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_empty() {
            return None;
        }
        let item = self.cursor.instruction();
        if item.is_err() {
            // Stop after the first error; the cursor position is unreliable.
            self.cursor.pos = self.cursor.data.len();
        }
        Some(item)
    }
}

/// Encode a uniform delta varint.
pub fn write_varint(mut value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return buf;
        }
        buf.push(byte | 0x80);
    }
}

/// Encode a copy instruction. Zero bytes of offset or size are omitted.
pub fn encode_copy(offset: u32, size: usize) -> Vec<u8> {
    let mut op = 0x80u8;
    let mut tail = Vec::with_capacity(7);
    for (i, b) in offset.to_le_bytes().into_iter().enumerate() {
        if b != 0 {
            op |= 1 << i;
            tail.push(b);
        }
    }
    // 0x10000 is the implicit size when no size bytes are present.
    let size = if size == MAX_COPY_SIZE { 0 } else { size };
    for (i, b) in size.to_le_bytes().into_iter().take(3).enumerate() {
        if b != 0 {
            op |= 0x10 << i;
            tail.push(b);
        }
    }
    let mut buf = Vec::with_capacity(1 + tail.len());
    buf.push(op);
    buf.extend_from_slice(&tail);
    buf
}

/// Encode `data` as insert instructions, split into runs of at most 127 bytes.
pub fn encode_insert(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + data.len() / MAX_INSERT_SIZE + 1);
    for run in data.chunks(MAX_INSERT_SIZE) {
        buf.push(run.len() as u8);
        buf.extend_from_slice(run);
    }
    buf
}
