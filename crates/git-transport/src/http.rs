//! Smart-HTTP requests over a raw stream.
//!
//! Each exchange is one HTTP/1.1 request with `Connection: close`; the
//! response is read until the peer closes the stream. There is no retry,
//! no redirect handling and no keep-alive.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use tracing::{debug, trace};

use crate::{Connector, GitUrl, PlainConnector, Scheme, TlsConnector, TransportError};

const UPLOAD_PACK: &str = "git-upload-pack";

/// Settings for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub user_agent: String,
    /// Overrides the port from the URL.
    pub port: Option<u16>,
    /// `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("mgit/", env!("CARGO_PKG_VERSION")).to_string(),
            port: None,
            connect_timeout: None,
        }
    }
}

/// Blocking smart-HTTP client for the upload-pack service.
pub struct HttpClient {
    connector: Box<dyn Connector>,
    options: HttpOptions,
}

impl HttpClient {
    /// A client that connects with TLS for `https` and plain TCP for `http`.
    pub fn new(scheme: Scheme, options: HttpOptions) -> Result<Self, TransportError> {
        let connector: Box<dyn Connector> = match scheme {
            Scheme::Https => Box::new(TlsConnector::new(options.connect_timeout)?),
            Scheme::Http => Box::new(PlainConnector {
                timeout: options.connect_timeout,
            }),
        };
        Ok(Self::with_connector(connector, options))
    }

    pub fn with_connector(connector: Box<dyn Connector>, options: HttpOptions) -> Self {
        Self { connector, options }
    }

    /// `GET <path>/info/refs?service=git-upload-pack`.
    ///
    /// Returns the raw response, headers included.
    pub fn get_refs(&self, url: &GitUrl) -> Result<Vec<u8>, TransportError> {
        let request = format!(
            "GET {}/info/refs?service={UPLOAD_PACK} HTTP/1.1\r\n\
             Host: {}\r\n\
             User-Agent: {}\r\n\
             Accept: */*\r\n\
             Connection: close\r\n\
             \r\n",
            url.path,
            url.host_header(),
            self.options.user_agent,
        );
        self.exchange(url, request.as_bytes())
    }

    /// `POST <path>/git-upload-pack` with a negotiation body.
    ///
    /// Returns the raw response, headers included.
    pub fn post_upload_pack(&self, url: &GitUrl, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut request = format!(
            "POST {}/{UPLOAD_PACK} HTTP/1.1\r\n\
             Host: {}\r\n\
             User-Agent: {}\r\n\
             Content-Type: application/x-{UPLOAD_PACK}-request\r\n\
             Accept: application/x-{UPLOAD_PACK}-result\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            url.path,
            url.host_header(),
            self.options.user_agent,
            body.len(),
        )
        .into_bytes();
        request.extend_from_slice(body);
        self.exchange(url, &request)
    }

    fn exchange(&self, url: &GitUrl, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let port = self.options.port.unwrap_or_else(|| url.effective_port());
        let mut stream = self.connector.connect(&url.host, port)?;
        stream.write_all(request)?;
        stream.flush()?;
        trace!(bytes = request.len(), "request sent");

        let response = read_until_close(&mut stream)?;
        debug!(bytes = response.len(), host = %url.host, "response received");
        Ok(response)
    }
}

/// Read to EOF. A TLS peer that hangs up without `close_notify` is treated
/// as EOF once some data has arrived.
fn read_until_close(stream: &mut impl Read) -> Result<Vec<u8>, TransportError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 16 * 1024];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof && !out.is_empty() => return Ok(out),
            Err(e) => return Err(e.into()),
        }
    }
}

/// A parsed HTTP response with a de-chunked body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Split a raw response into status, headers and body.
    ///
    /// Non-2xx statuses are errors. A `Transfer-Encoding: chunked` body is
    /// de-chunked; otherwise `Content-Length` bytes are taken, or everything
    /// up to EOF when no length is given.
    pub fn parse(raw: &[u8]) -> Result<Self, TransportError> {
        let split = find(raw, b"\r\n\r\n")
            .ok_or_else(|| TransportError::InvalidResponse("no end of headers".into()))?;
        let head = String::from_utf8_lossy(&raw[..split]);
        let rest = &raw[split + 4..];

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap_or_default();
        let (status, reason) = parse_status_line(status_line)?;
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        if !(200..300).contains(&status) {
            return Err(TransportError::Http {
                status,
                message: reason,
            });
        }

        let mut response = Self {
            status,
            reason,
            headers,
            body: Vec::new(),
        };
        response.body = if response
            .header("transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
        {
            decode_chunked(rest)?
        } else if let Some(len) = response.header("content-length") {
            let len: usize = len
                .parse()
                .map_err(|_| TransportError::InvalidResponse(format!("bad Content-Length {len}")))?;
            rest.get(..len)
                .ok_or_else(|| {
                    TransportError::InvalidResponse(format!(
                        "body has {} bytes, Content-Length says {len}",
                        rest.len()
                    ))
                })?
                .to_vec()
        } else {
            rest.to_vec()
        };
        Ok(response)
    }

    /// Case-insensitive header lookup; the first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn parse_status_line(line: &str) -> Result<(u16, String), TransportError> {
    let bad = || TransportError::InvalidResponse(format!("bad status line {line:?}"));
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or_else(bad)?;
    if !version.starts_with("HTTP/") {
        return Err(bad());
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(bad)?;
    let reason = parts.next().unwrap_or_default().to_string();
    Ok((status, reason))
}

/// Remove HTTP chunked transfer framing.
///
/// Each chunk is a hex size line (extensions after `;` ignored), CRLF, the
/// data, CRLF. A zero-size chunk ends the body; trailers are ignored.
pub fn decode_chunked(data: &[u8]) -> Result<Vec<u8>, TransportError> {
    let invalid = TransportError::InvalidResponse;
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0usize;

    loop {
        let line_end = find(&data[pos..], b"\r\n")
            .map(|i| pos + i)
            .ok_or_else(|| invalid(format!("chunk size line at {pos} not terminated")))?;
        let line = std::str::from_utf8(&data[pos..line_end])
            .map_err(|_| invalid(format!("chunk size line at {pos} is not text")))?;
        let hex = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(hex, 16)
            .map_err(|_| invalid(format!("bad chunk size {hex:?}")))?;
        pos = line_end + 2;

        if size == 0 {
            return Ok(out);
        }
        let chunk = pos
            .checked_add(size)
            .and_then(|end| data.get(pos..end))
            .ok_or_else(|| invalid(format!("chunk of {size} bytes at {pos} is truncated")))?;
        out.extend_from_slice(chunk);
        pos += size;
        if data.get(pos..pos + 2) != Some(b"\r\n".as_slice()) {
            return Err(invalid(format!("missing CRLF after chunk at {pos}")));
        }
        pos += 2;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
