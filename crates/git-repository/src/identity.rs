use std::path::Path;

use git_object::{GitDate, Identity};
use tracing::warn;

const FALLBACK_NAME: &str = "Unknown";
const FALLBACK_EMAIL: &str = "unknown@unknown";

/// Which signature line an identity is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Author,
    Committer,
}

impl Role {
    fn env_prefix(self) -> &'static str {
        match self {
            Self::Author => "GIT_AUTHOR",
            Self::Committer => "GIT_COMMITTER",
        }
    }
}

/// The author and committer for a new commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identities {
    pub author: Identity,
    pub committer: Identity,
}

impl Identities {
    /// Resolve from `GIT_{AUTHOR,COMMITTER}_{NAME,EMAIL,DATE}`, then the
    /// `[user]` section of `config_path`, then fixed fallbacks.
    pub fn from_env(config_path: Option<&Path>) -> Self {
        let config = config_path.and_then(|p| std::fs::read_to_string(p).ok());
        Self::resolve(|key| std::env::var(key).ok(), config.as_deref())
    }

    /// Resolve with an explicit variable lookup.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>, config: Option<&str>) -> Self {
        let user = config.map(UserSection::parse).unwrap_or_default();
        Self {
            author: resolve_one(Role::Author, &lookup, &user),
            committer: resolve_one(Role::Committer, &lookup, &user),
        }
    }

    pub fn get(&self, role: Role) -> &Identity {
        match role {
            Role::Author => &self.author,
            Role::Committer => &self.committer,
        }
    }
}

fn resolve_one(
    role: Role,
    lookup: &impl Fn(&str) -> Option<String>,
    user: &UserSection,
) -> Identity {
    let prefix = role.env_prefix();
    let var = |suffix: &str| lookup(&format!("{prefix}_{suffix}")).filter(|v| !v.is_empty());

    let name = var("NAME")
        .or_else(|| user.name.clone())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    let email = var("EMAIL")
        .or_else(|| user.email.clone())
        .unwrap_or_else(|| FALLBACK_EMAIL.to_string());

    let mut identity = Identity::new(name, email);
    if let Some(raw) = var("DATE") {
        match GitDate::parse_raw(&raw) {
            Ok(date) => identity = identity.with_date(date),
            Err(e) => warn!("ignoring {prefix}_DATE: {e}"),
        }
    }
    identity
}

/// `user.name` and `user.email` from a git config file.
#[derive(Debug, Default)]
struct UserSection {
    name: Option<String>,
    email: Option<String>,
}

impl UserSection {
    fn parse(text: &str) -> Self {
        let mut out = Self::default();
        let mut in_user = false;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[') {
                let section = section.trim_end_matches(']').trim();
                in_user = section.eq_ignore_ascii_case("user");
                continue;
            }
            if !in_user {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => out.name = Some(value),
                "email" => out.email = Some(value),
                _ => {}
            }
        }
        out
    }
}
