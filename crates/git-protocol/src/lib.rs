//! The upload-pack side of the git smart-HTTP protocol.
//!
//! Pkt-line framing, ref advertisement parsing, the single-`want`
//! negotiation request, side-band demultiplexing, and [`clone`], which ties
//! them to the transport and pack decoder.

pub mod advertisement;
pub mod capability;
mod clone;
pub mod pktline;
pub mod sideband;

pub use advertisement::{build_negotiation_request, parse_refs, Advertisement};
pub use capability::Capabilities;
pub use clone::{clone, clone_with, CloneOptions, CloneOutcome};

use git_transport::TransportError;

/// Errors that can occur during protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("remote advertised no HEAD")]
    MissingHead,

    #[error("remote error: {0}")]
    ServerError(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Pack(#[from] git_pack::PackError),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Hash(#[from] git_hash::HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
