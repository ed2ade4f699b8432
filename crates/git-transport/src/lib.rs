//! Transport layer for mgit's smart-HTTP client.
//!
//! This crate moves bytes: it opens a connection (TLS for `https://`, plain
//! TCP for `http://`), sends one HTTP/1.1 request, and reads the response
//! until the peer closes. Pkt-line framing and ref parsing live in
//! `git-protocol`.

pub mod connector;
pub mod http;
pub mod url;

use std::fmt;
use std::io::{Read, Write};

pub use connector::{Connector, PlainConnector, TlsConnector};
pub use http::{HttpClient, HttpOptions, HttpResponse};

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        address: String,
        source: std::io::Error,
    },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("HTTP error: {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed HTTP response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// URL scheme of a remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

/// Parsed remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitUrl {
    pub scheme: Scheme,
    pub host: String,
    pub port: Option<u16>,
    /// Repository path without a trailing `/`; empty for the server root.
    pub path: String,
}

impl GitUrl {
    /// The port to connect to: explicit, or the scheme default.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    /// Value for the `Host` request header.
    pub fn host_header(&self) -> String {
        match self.port {
            Some(port) if port != self.scheme.default_port() => format!("{}:{port}", self.host),
            _ => self.host.clone(),
        }
    }
}

impl fmt::Display for GitUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]", self.scheme, self.host)?;
        } else {
            write!(f, "{}://{}", self.scheme, self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.path)
    }
}

/// A connected byte-duplex stream.
pub trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}
