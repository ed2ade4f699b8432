//! Lowercase hex encoding for digests.

use crate::HashError;

/// ASCII byte to nibble value; 0xff marks a non-hex byte.
const NIBBLE: [u8; 256] = {
    let mut table = [0xffu8; 256];
    let mut i = 0;
    while i < 256 {
        let c = i as u8;
        table[i] = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => 0xff,
        };
        i += 1;
    }
    table
};

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Encode `bytes` as a lowercase hex string.
pub fn encode_to_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decode `hex` into `out`; `hex` must be exactly twice as long as `out`.
pub fn decode_into(hex: &[u8], out: &mut [u8]) -> Result<(), HashError> {
    if hex.len() != out.len() * 2 {
        return Err(HashError::InvalidHexLength {
            expected: out.len() * 2,
            actual: hex.len(),
        });
    }
    for (i, pair) in hex.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0], i * 2)?;
        let lo = nibble(pair[1], i * 2 + 1)?;
        out[i] = (hi << 4) | lo;
    }
    Ok(())
}

/// Decode a hex string of any even length.
pub fn decode(hex: &str) -> Result<Vec<u8>, HashError> {
    if hex.len() % 2 != 0 {
        return Err(HashError::InvalidHexLength {
            expected: hex.len() + 1,
            actual: hex.len(),
        });
    }
    let mut out = vec![0u8; hex.len() / 2];
    decode_into(hex.as_bytes(), &mut out)?;
    Ok(out)
}

/// True when every byte of `hex` is a hex digit.
pub fn is_hex(hex: &[u8]) -> bool {
    hex.iter().all(|&b| NIBBLE[b as usize] != 0xff)
}

fn nibble(c: u8, position: usize) -> Result<u8, HashError> {
    match NIBBLE[c as usize] {
        0xff => Err(HashError::InvalidHex {
            position,
            character: c as char,
        }),
        v => Ok(v),
    }
}
