use std::cmp::Ordering;

use bstr::{BStr, BString, ByteSlice};
use git_hash::{ObjectId, DIGEST_LEN};

use crate::ObjectError;

/// File mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// 100644
    Regular,
    /// 100755
    Executable,
    /// 120000
    Symlink,
    /// 160000
    Gitlink,
    /// 40000
    Tree,
    /// Anything else, kept so unusual trees round-trip.
    Unknown(u32),
}

impl FileMode {
    /// Parse octal ASCII such as `b"100644"`.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        let raw = parse_octal(s)
            .ok_or_else(|| ObjectError::InvalidFileMode(String::from_utf8_lossy(s).into()))?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0o100644 => Self::Regular,
            0o100755 => Self::Executable,
            0o120000 => Self::Symlink,
            0o160000 => Self::Gitlink,
            0o040000 => Self::Tree,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Gitlink => 0o160000,
            Self::Tree => 0o40000,
            Self::Unknown(v) => *v,
        }
    }

    /// Octal text as written in tree payloads; trees have no leading zero.
    pub fn as_bytes(&self) -> BString {
        BString::from(format!("{:o}", self.raw()))
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }
}

fn parse_octal(s: &[u8]) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    s.iter().try_fold(0u32, |acc, &b| {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        acc.checked_mul(8)?.checked_add(u32::from(b - b'0'))
    })
}

/// One `(mode, name, id)` row of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: BString,
    pub oid: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: FileMode, name: impl Into<BString>, oid: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            oid,
        }
    }

    /// Git's canonical entry order: bytewise, with directories compared
    /// as though their name ended in `/`.
    pub fn canonical_cmp(a: &TreeEntry, b: &TreeEntry) -> Ordering {
        let (n1, n2) = (a.name.as_bytes(), b.name.as_bytes());
        let common = n1.len().min(n2.len());
        n1[..common].cmp(&n2[..common]).then_with(|| {
            let next = |name: &[u8], is_dir: bool| match name.get(common) {
                Some(&c) => c,
                None if is_dir => b'/',
                None => 0,
            };
            next(n1, a.mode.is_tree()).cmp(&next(n2, b.mode.is_tree()))
        })
    }
}

/// A directory listing.
///
/// Entries are kept in the order they were added or parsed; serialization
/// never reorders them. Writers that want git's canonical order call
/// [`Tree::sort`] first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TreeEntry) {
        self.entries.push(entry);
    }

    /// Parse the binary payload: repeated `<mode> <name>\0<20 raw bytes>`.
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < payload.len() {
            let rest = &payload[pos..];
            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing space after mode".into(),
                })?;
            let mode =
                FileMode::from_bytes(&rest[..space]).map_err(|_| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "invalid mode".into(),
                })?;

            let name_start = space + 1;
            let nul = rest[name_start..]
                .iter()
                .position(|&b| b == 0)
                .map(|p| p + name_start)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos + name_start,
                    reason: "missing NUL after name".into(),
                })?;
            if nul == name_start {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: pos + name_start,
                    reason: "empty name".into(),
                });
            }

            let id_start = nul + 1;
            let id_bytes = rest
                .get(id_start..id_start + DIGEST_LEN)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos + id_start,
                    reason: "truncated object id".into(),
                })?;

            entries.push(TreeEntry {
                mode,
                name: BString::from(&rest[name_start..nul]),
                oid: ObjectId::from_bytes(id_bytes)?,
            });
            pos += id_start + DIGEST_LEN;
        }

        Ok(Self { entries })
    }

    /// Serialize entries in their current order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 48);
        for entry in &self.entries {
            out.extend_from_slice(&entry.mode.as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.oid.as_bytes());
        }
        out
    }

    /// Reorder entries into git's canonical order.
    pub fn sort(&mut self) {
        self.entries.sort_by(TreeEntry::canonical_cmp);
    }

    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
