use bstr::{BString, ByteVec};
use chrono::Local;
use git_hash::ObjectId;

use crate::ObjectError;

/// A point in time as git records it: seconds since the epoch plus the
/// author's UTC offset in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitDate {
    pub timestamp: i64,
    pub tz_offset: i32,
}

impl GitDate {
    pub fn new(timestamp: i64, tz_offset_minutes: i32) -> Self {
        Self {
            timestamp,
            tz_offset: tz_offset_minutes,
        }
    }

    /// The current local time.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            timestamp: now.timestamp(),
            tz_offset: now.offset().local_minus_utc() / 60,
        }
    }

    /// Parse git's raw form, `"<seconds> <+hhmm>"`.
    pub fn parse_raw(s: &str) -> Result<Self, ObjectError> {
        let bad = || ObjectError::InvalidDate(s.to_owned());
        let (secs, tz) = s.trim().split_once(' ').ok_or_else(bad)?;
        let timestamp: i64 = secs.trim_start_matches('@').parse().map_err(|_| bad())?;

        let (sign, digits) = match tz.as_bytes().first() {
            Some(b'+') => (1, &tz[1..]),
            Some(b'-') => (-1, &tz[1..]),
            _ => return Err(bad()),
        };
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let hhmm: i32 = digits.parse().map_err(|_| bad())?;
        Ok(Self::new(timestamp, sign * ((hhmm / 100) * 60 + hhmm % 100)))
    }

    /// `"<seconds> <+hhmm>"`.
    pub fn to_raw(&self) -> String {
        let sign = if self.tz_offset < 0 { '-' } else { '+' };
        let abs = self.tz_offset.unsigned_abs();
        format!(
            "{} {}{:02}{:02}",
            self.timestamp,
            sign,
            abs / 60,
            abs % 60
        )
    }
}

/// `Name <email> <seconds> <+hhmm>`, the form used on author and committer lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    pub date: GitDate,
}

impl Signature {
    pub fn to_bytes(&self) -> BString {
        let mut out = BString::new(Vec::new());
        out.push_str(&self.name);
        out.push_str(b" <");
        out.push_str(&self.email);
        out.push_str(b"> ");
        out.push_str(self.date.to_raw());
        out
    }
}

/// Who is making a commit.
///
/// Passed explicitly into commit construction. `date` pins the timestamp;
/// when `None` the signature is stamped with the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: BString,
    pub email: BString,
    pub date: Option<GitDate>,
}

impl Identity {
    pub fn new(name: impl Into<BString>, email: impl Into<BString>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            date: None,
        }
    }

    pub fn with_date(mut self, date: GitDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn signature(&self) -> Signature {
        Signature {
            name: self.name.clone(),
            email: self.email.clone(),
            date: self.date.unwrap_or_else(GitDate::now),
        }
    }
}

/// Assembles a commit payload.
#[derive(Debug, Clone)]
pub struct CommitBuilder {
    tree: ObjectId,
    parents: Vec<ObjectId>,
    author: Signature,
    committer: Signature,
    message: BString,
}

impl CommitBuilder {
    pub fn new(tree: ObjectId, author: &Identity, committer: &Identity) -> Self {
        Self {
            tree,
            parents: Vec::new(),
            author: author.signature(),
            committer: committer.signature(),
            message: BString::new(Vec::new()),
        }
    }

    pub fn parent(mut self, parent: ObjectId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn parents(mut self, parents: impl IntoIterator<Item = ObjectId>) -> Self {
        self.parents.extend(parents);
        self
    }

    /// Set the message. A trailing newline is added if missing, as `git commit-tree` does.
    pub fn message(mut self, message: impl Into<BString>) -> Self {
        let mut message = message.into();
        if !message.ends_with(b"\n") {
            message.push(b'\n');
        }
        self.message = message;
        self
    }

    /// The commit payload: header lines, a blank line, then the message.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');
        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.to_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.to_bytes());
        out.push(b'\n');
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }
}

/// Read the `tree` line from a commit payload.
pub fn commit_tree(payload: &[u8]) -> Result<ObjectId, ObjectError> {
    let line = payload
        .split(|&b| b == b'\n')
        .next()
        .and_then(|l| l.strip_prefix(b"tree "))
        .ok_or_else(|| ObjectError::InvalidHeader("commit has no tree line".into()))?;
    Ok(ObjectId::from_hex_bytes(line)?)
}
