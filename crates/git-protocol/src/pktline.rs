//! Pkt-line framing.
//!
//! Every packet starts with four hex digits giving the length of the whole
//! packet, header included. Special lengths:
//! - `0000`: flush, ends a section
//! - `0001`: delimiter
//! - `0002`: response end
//!
//! Lengths 3 and anything past [`MAX_PKT_LEN`] are invalid.

use std::io::Write;

use crate::ProtocolError;

/// Largest payload a single packet may carry.
pub const MAX_PKT_DATA_LEN: usize = 65516;

/// Largest packet, header included.
pub const MAX_PKT_LEN: usize = MAX_PKT_DATA_LEN + 4;

/// The flush packet.
pub const FLUSH_PKT: &[u8; 4] = b"0000";

/// A packet borrowed from an in-memory buffer, as produced by [`decode_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    Data(&'a [u8]),
    Flush,
    Delimiter,
    ResponseEnd,
}

/// Frame `data` as one packet.
pub fn encode_line(data: impl AsRef<[u8]>) -> Result<Vec<u8>, ProtocolError> {
    let data = data.as_ref();
    if data.len() > MAX_PKT_DATA_LEN {
        return Err(ProtocolError::InvalidPktLine(format!(
            "{} bytes is too long for one packet (max {MAX_PKT_DATA_LEN})",
            data.len()
        )));
    }
    let mut out = Vec::with_capacity(data.len() + 4);
    out.extend_from_slice(format!("{:04x}", data.len() + 4).as_bytes());
    out.extend_from_slice(data);
    Ok(out)
}

pub fn encode_flush() -> Vec<u8> {
    FLUSH_PKT.to_vec()
}

/// Decode a length header.
fn parse_len(header: &[u8; 4]) -> Result<usize, ProtocolError> {
    let mut len = 0usize;
    for &b in header {
        let digit = (b as char).to_digit(16).ok_or_else(|| {
            ProtocolError::InvalidPktLine(format!(
                "bad length {:?}",
                String::from_utf8_lossy(header)
            ))
        })?;
        len = len * 16 + digit as usize;
    }
    if len == 3 || len > MAX_PKT_LEN {
        return Err(ProtocolError::InvalidPktLine(format!("invalid length {len}")));
    }
    Ok(len)
}

/// Lazily decode the packets of an in-memory buffer.
///
/// Flush and delimiter packets are yielded like any other, so callers
/// decide whether they end a section. Iteration stops at the end of the
/// buffer, or after yielding the first error.
pub fn decode_stream(data: &[u8]) -> PktLines<'_> {
    PktLines { data, pos: 0 }
}

/// Iterator returned by [`decode_stream`].
#[derive(Debug, Clone)]
pub struct PktLines<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PktLines<'a> {
    /// Bytes not yet decoded.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl<'a> Iterator for PktLines<'a> {
    type Item = Result<Packet<'a>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.remaining();
        if rest.is_empty() {
            return None;
        }
        let Some(header) = rest.get(..4).and_then(|h| <&[u8; 4]>::try_from(h).ok()) else {
            self.pos = self.data.len();
            return Some(Err(ProtocolError::InvalidPktLine(format!(
                "{} stray bytes at end of stream",
                rest.len()
            ))));
        };
        let len = match parse_len(header) {
            Ok(len) => len,
            Err(e) => {
                self.pos = self.data.len();
                return Some(Err(e));
            }
        };
        let packet = match len {
            0 => Packet::Flush,
            1 => Packet::Delimiter,
            2 => Packet::ResponseEnd,
            _ => match rest.get(4..len) {
                Some(payload) => Packet::Data(payload),
                None => {
                    self.pos = self.data.len();
                    return Some(Err(ProtocolError::InvalidPktLine(format!(
                        "packet of {len} bytes truncated to {}",
                        rest.len()
                    ))));
                }
            },
        };
        self.pos += len.max(4);
        Some(Ok(packet))
    }
}

/// Writes packets to a byte sink.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_line(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.writer.write_all(&encode_line(data)?)?;
        Ok(())
    }

    /// Write `text`, adding a trailing newline if it has none.
    pub fn write_text(&mut self, text: &str) -> Result<(), ProtocolError> {
        if text.ends_with('\n') {
            self.write_line(text.as_bytes())
        } else {
            self.write_line(format!("{text}\n").as_bytes())
        }
    }

    pub fn write_flush(&mut self) -> Result<(), ProtocolError> {
        self.writer.write_all(FLUSH_PKT)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ProtocolError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_hello() {
        assert_eq!(encode_line("hello\n").unwrap(), b"000ahello\n");
        assert_eq!(encode_line("").unwrap(), b"0004");
        assert_eq!(encode_flush(), b"0000");
    }

    #[test]
    fn decode_single_line() {
        let encoded = encode_line("hello\n").unwrap();
        let packets: Vec<_> = decode_stream(&encoded).collect::<Result<_, _>>().unwrap();
        assert_eq!(packets, vec![Packet::Data(b"hello\n")]);
    }

    #[test]
    fn decode_flush_yields_no_lines() {
        let flush = encode_flush();
        let packets: Vec<_> = decode_stream(&flush).collect::<Result<_, _>>().unwrap();
        assert_eq!(packets, vec![Packet::Flush]);
        assert!(!packets.iter().any(|p| matches!(p, Packet::Data(_))));
    }

    #[test]
    fn decode_special_packets() {
        let packets: Vec<_> = decode_stream(b"000100020000")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            packets,
            vec![Packet::Delimiter, Packet::ResponseEnd, Packet::Flush]
        );
    }

    #[test]
    fn decode_stops_on_malformed_length() {
        let mut stream = decode_stream(b"0006a\nzzzzmore");
        assert_eq!(stream.next().unwrap().unwrap(), Packet::Data(b"a\n"));
        assert!(matches!(
            stream.next(),
            Some(Err(ProtocolError::InvalidPktLine(_)))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn decode_rejects_length_three_and_truncation() {
        assert!(decode_stream(b"0003").next().unwrap().is_err());
        assert!(decode_stream(b"000ahel").next().unwrap().is_err());
        assert!(decode_stream(b"00").next().unwrap().is_err());
    }

    #[test]
    fn remaining_after_section() {
        let mut stream = decode_stream(b"0008abcd0000PACK....");
        stream.next();
        stream.next();
        assert_eq!(stream.remaining(), b"PACK....");
    }

    #[test]
    fn writer_output_decodes() {
        let mut buf = Vec::new();
        {
            let mut writer = PktLineWriter::new(&mut buf);
            writer.write_text("line1").unwrap();
            writer.write_line(b"line2\n").unwrap();
            writer.write_flush().unwrap();
            writer.write_text("after").unwrap();
        }
        assert_eq!(&buf[..10], b"000aline1\n");

        let packets: Vec<_> = decode_stream(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(
            packets,
            vec![
                Packet::Data(b"line1\n"),
                Packet::Data(b"line2\n"),
                Packet::Flush,
                Packet::Data(b"after\n"),
            ]
        );
    }

    #[test]
    fn writer_rejects_oversized_payload() {
        let mut writer = PktLineWriter::new(Vec::new());
        assert!(writer.write_line(&vec![0u8; MAX_PKT_DATA_LEN + 1]).is_err());
        assert!(writer.write_line(&vec![0u8; MAX_PKT_DATA_LEN]).is_ok());
    }
}
