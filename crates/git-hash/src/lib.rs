//! Object identity for mgit.
//!
//! Every object is named by the SHA-1 of its framed bytes
//! (`"<kind> <len>\0" + payload`). This crate owns the 20-byte
//! [`ObjectId`], its hex form, and the streaming [`Hasher`] that
//! produces it.

mod error;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use hasher::Hasher;
pub use oid::ObjectId;

/// Length of a raw SHA-1 digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// Length of a SHA-1 digest in hex characters.
pub const HEX_LEN: usize = 40;
