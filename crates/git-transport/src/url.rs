//! Remote URL parsing.
//!
//! Only the smart-HTTP forms are accepted:
//! - `http://host[:port]/path`
//! - `https://host[:port]/path`
//! - `http[s]://[v6-address]:port/path`

use crate::{GitUrl, Scheme, TransportError};

impl GitUrl {
    /// Parse a remote URL.
    pub fn parse(url: &str) -> Result<Self, TransportError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(TransportError::InvalidUrl("empty URL".into()));
        }

        let (scheme, rest) = if let Some(rest) = url.strip_prefix("https://") {
            (Scheme::Https, rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            (Scheme::Http, rest)
        } else if let Some((scheme, _)) = url.split_once("://") {
            return Err(TransportError::UnsupportedScheme(scheme.to_string()));
        } else {
            return Err(TransportError::UnsupportedScheme(format!(
                "no scheme in {url}"
            )));
        };

        let (authority, path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, ""),
        };
        if authority.contains('@') {
            return Err(TransportError::InvalidUrl(format!(
                "credentials in URL are not supported: {url}"
            )));
        }

        let (host, port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(TransportError::InvalidUrl(format!("empty host in {url}")));
        }

        Ok(GitUrl {
            scheme,
            host,
            port,
            path: path.trim_end_matches('/').to_string(),
        })
    }
}

fn split_host_port(authority: &str) -> Result<(String, Option<u16>), TransportError> {
    let parse_port = |s: &str| {
        s.parse::<u16>()
            .map_err(|_| TransportError::InvalidUrl(format!("invalid port: {s}")))
    };

    if let Some(v6) = authority.strip_prefix('[') {
        let Some((host, after)) = v6.split_once(']') else {
            return Err(TransportError::InvalidUrl("unclosed IPv6 bracket".into()));
        };
        let port = match after.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if after.is_empty() => None,
            None => {
                return Err(TransportError::InvalidUrl(format!(
                    "unexpected text after IPv6 address: {after}"
                )))
            }
        };
        return Ok((host.to_string(), port));
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), Some(parse_port(port)?))),
        None => Ok((authority.to_string(), None)),
    }
}
