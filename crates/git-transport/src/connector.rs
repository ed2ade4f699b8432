//! Opening byte streams to a remote host.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::{Stream, TransportError};

/// Something that can open a duplex stream to `host:port`.
///
/// The HTTP client only ever talks to this trait, so tests can substitute
/// an in-memory stream for the network.
pub trait Connector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Stream>, TransportError>;
}

/// Plain TCP, used for `http://` remotes.
#[derive(Debug, Clone, Default)]
pub struct PlainConnector {
    pub timeout: Option<Duration>,
}

impl Connector for PlainConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Stream>, TransportError> {
        Ok(Box::new(tcp_connect(host, port, self.timeout)?))
    }
}

/// TLS over TCP, used for `https://` remotes.
pub struct TlsConnector {
    inner: native_tls::TlsConnector,
    timeout: Option<Duration>,
}

impl TlsConnector {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let inner =
            native_tls::TlsConnector::new().map_err(|e| TransportError::Tls(e.to_string()))?;
        Ok(Self { inner, timeout })
    }
}

impl Connector for TlsConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Stream>, TransportError> {
        let tcp = tcp_connect(host, port, self.timeout)?;
        let tls = self
            .inner
            .connect(host, tcp)
            .map_err(|e| TransportError::Tls(format!("handshake with {host} failed: {e}")))?;
        debug!(host, port, "TLS session established");
        Ok(Box::new(tls))
    }
}

fn tcp_connect(
    host: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<TcpStream, TransportError> {
    let address = format!("{host}:{port}");
    let failed = |source| TransportError::ConnectionFailed {
        address: address.clone(),
        source,
    };

    let stream = match timeout {
        None => TcpStream::connect((host, port)).map_err(failed)?,
        Some(timeout) => {
            let mut last_err = None;
            let mut connected = None;
            for addr in (host, port).to_socket_addrs().map_err(failed)? {
                match TcpStream::connect_timeout(&addr, timeout) {
                    Ok(stream) => {
                        connected = Some(stream);
                        break;
                    }
                    Err(e) => last_err = Some(e),
                }
            }
            match connected {
                Some(stream) => stream,
                None => {
                    return Err(failed(last_err.unwrap_or_else(|| {
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "host resolved to no addresses",
                        )
                    })))
                }
            }
        }
    };
    debug!(%address, "connected");
    Ok(stream)
}
