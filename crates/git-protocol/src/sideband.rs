//! Side-band demultiplexing of an upload-pack response.
//!
//! With `side-band-64k` the server wraps its output in pkt-lines whose
//! first payload byte names a channel:
//! - 1: pack data
//! - 2: progress text
//! - 3: fatal error text

use tracing::{info, trace, warn};

use crate::pktline::{decode_stream, Packet};
use crate::ProtocolError;

/// Side-band channel identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Data = 1,
    Progress = 2,
    Error = 3,
}

impl Band {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Data),
            2 => Some(Self::Progress),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Extract the packfile from an upload-pack response body.
///
/// `NAK`/`ACK` lines and flushes are skipped. Channel 1 payloads are
/// concatenated, channel 2 is logged under `remote`, and channel 3 fails
/// with [`ProtocolError::ServerError`]. If the raw bytes `PACK` turn up where
/// a pkt-line length is expected, everything from there on is the pack.
pub fn demux_pack(body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut pack = Vec::with_capacity(body.len());
    let mut lines = decode_stream(body);

    loop {
        let rest = lines.remaining();
        if rest.starts_with(b"PACK") {
            trace!(bytes = rest.len(), "pack without side-band");
            pack.extend_from_slice(rest);
            break;
        }
        let Some(packet) = lines.next() else {
            break;
        };
        let Packet::Data(line) = packet? else {
            continue;
        };
        if line.starts_with(b"NAK") || line.starts_with(b"ACK") {
            continue;
        }
        let Some((&channel, payload)) = line.split_first() else {
            continue;
        };
        match Band::from_byte(channel) {
            Some(Band::Data) => pack.extend_from_slice(payload),
            Some(Band::Progress) => {
                let text = String::from_utf8_lossy(payload);
                let text = text.trim_end_matches(['\r', '\n']);
                if !text.is_empty() {
                    info!(remote = %text);
                }
            }
            Some(Band::Error) => {
                let text = String::from_utf8_lossy(payload);
                return Err(ProtocolError::ServerError(text.trim_end().to_string()));
            }
            None => warn!(channel, bytes = payload.len(), "skipping unknown side-band channel"),
        }
    }

    if pack.is_empty() {
        return Err(ProtocolError::Protocol(
            "upload-pack response carried no pack data".to_string(),
        ));
    }
    Ok(pack)
}

/// Frame `data` on `band`, split to fit the pkt-line limit.
pub fn encode_sideband(band: Band, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let max_chunk = crate::pktline::MAX_PKT_DATA_LEN - 1;
    let mut out = Vec::with_capacity(data.len() + data.len() / max_chunk * 5 + 5);
    for chunk in data.chunks(max_chunk) {
        let mut pkt = Vec::with_capacity(1 + chunk.len());
        pkt.push(band as u8);
        pkt.extend_from_slice(chunk);
        out.extend_from_slice(&crate::pktline::encode_line(&pkt)?);
    }
    Ok(out)
}
