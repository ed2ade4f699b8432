//! Ref advertisement parsing and the clone negotiation request.

use std::collections::BTreeMap;

use git_hash::{ObjectId, HEX_LEN};
use tracing::debug;

use crate::capability::Capabilities;
use crate::pktline::{decode_stream, Packet, PktLineWriter};
use crate::ProtocolError;

/// Capabilities the client asks for in its `want` line.
pub const CLIENT_CAPABILITIES: &str = "multi_ack side-band-64k ofs-delta";

/// Refs and capabilities from `GET info/refs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// `HEAD` and every `refs/...` name, with the id each points at.
    pub refs: BTreeMap<String, ObjectId>,
    pub capabilities: Capabilities,
}

impl Advertisement {
    /// Parse an advertisement body (HTTP framing already removed).
    ///
    /// The `# service=` announcement and flush packets are skipped. Lines
    /// whose ref name is neither `HEAD` nor under `refs/` are ignored. The
    /// capability list is taken from the first line that carries one.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut refs = BTreeMap::new();
        let mut capabilities = None;

        for packet in decode_stream(body) {
            let Packet::Data(line) = packet? else {
                continue;
            };
            let line = line.strip_suffix(b"\n").unwrap_or(line);
            if line.starts_with(b"# service=") || line.is_empty() {
                continue;
            }

            let (record, caps) = match line.iter().position(|&b| b == 0) {
                Some(nul) => (&line[..nul], Some(&line[nul + 1..])),
                None => (line, None),
            };
            if let (None, Some(caps)) = (&capabilities, caps) {
                capabilities = Some(Capabilities::parse(&String::from_utf8_lossy(caps)));
            }

            let (oid, name) = parse_ref_record(record)?;
            if name == "HEAD" || name.starts_with("refs/") {
                refs.insert(name, oid);
            }
        }

        if !refs.contains_key("HEAD") {
            return Err(ProtocolError::MissingHead);
        }
        debug!(refs = refs.len(), "parsed ref advertisement");
        Ok(Self {
            refs,
            capabilities: capabilities.unwrap_or_default(),
        })
    }

    /// The id `HEAD` points at.
    pub fn head(&self) -> ObjectId {
        // `parse` refuses advertisements without HEAD.
        self.refs.get("HEAD").copied().unwrap_or(ObjectId::NULL)
    }

    /// The branch behind `HEAD`: from `symref=HEAD:...` when advertised,
    /// otherwise the single `refs/heads/*` entry pointing at the same id,
    /// if exactly one does.
    pub fn head_branch(&self) -> Option<&str> {
        if let Some(target) = self.capabilities.symref("HEAD") {
            return Some(target);
        }
        let head = self.head();
        let mut candidates = self
            .refs
            .iter()
            .filter(|(name, oid)| name.starts_with("refs/heads/") && **oid == head)
            .map(|(name, _)| name.as_str());
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

/// `<40 hex> <name>`
fn parse_ref_record(record: &[u8]) -> Result<(ObjectId, String), ProtocolError> {
    let malformed =
        || ProtocolError::Protocol(format!("malformed ref line {:?}", String::from_utf8_lossy(record)));
    if record.len() < HEX_LEN + 2 || record[HEX_LEN] != b' ' {
        return Err(malformed());
    }
    let oid = ObjectId::from_hex_bytes(&record[..HEX_LEN]).map_err(|_| malformed())?;
    let name = String::from_utf8(record[HEX_LEN + 1..].to_vec()).map_err(|_| malformed())?;
    Ok((oid, name))
}

/// Map of ref name to id, from an advertisement body.
///
/// Fails with [`ProtocolError::MissingHead`] when no `HEAD` entry is present.
pub fn parse_refs(body: &[u8]) -> Result<BTreeMap<String, ObjectId>, ProtocolError> {
    Advertisement::parse(body).map(|adv| adv.refs)
}

/// Body of the `POST git-upload-pack` request for a full clone of `want`:
/// one `want` line with [`CLIENT_CAPABILITIES`], a flush, then `done`.
pub fn build_negotiation_request(want: &ObjectId) -> Result<Vec<u8>, ProtocolError> {
    let mut writer = PktLineWriter::new(Vec::new());
    writer.write_text(&format!("want {want} {CLIENT_CAPABILITIES}"))?;
    writer.write_flush()?;
    writer.write_text("done")?;
    Ok(writer.into_inner())
}
