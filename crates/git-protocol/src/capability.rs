//! Server capabilities.
//!
//! The first line of a ref advertisement carries them after a NUL byte:
//! `<oid> HEAD\0multi_ack side-band-64k ofs-delta symref=HEAD:refs/heads/main agent=git/2.39.0`

use std::fmt;

/// Capabilities advertised by the server, in advertisement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    entries: Vec<(String, Option<String>)>,
}

impl Capabilities {
    /// Parse a space-separated capability list.
    pub fn parse(list: &str) -> Self {
        let entries = list
            .split_whitespace()
            .map(|cap| match cap.split_once('=') {
                Some((name, value)) => (name.to_string(), Some(value.to_string())),
                None => (cap.to_string(), None),
            })
            .collect();
        Self { entries }
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Value of the first capability called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Values of every capability called `name` (`symref` may repeat).
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .filter_map(|(_, v)| v.as_deref())
            .collect()
    }

    /// Target of `symref=<name>:<target>`, e.g. the branch behind `HEAD`.
    pub fn symref(&self, name: &str) -> Option<&str> {
        self.get_all("symref").into_iter().find_map(|value| {
            let (source, target) = value.split_once(':')?;
            (source == name).then_some(target)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match value {
                Some(v) => write!(f, "{name}={v}")?,
                None => f.write_str(name)?,
            }
        }
        Ok(())
    }
}
