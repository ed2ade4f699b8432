//! Repository layout for mgit: `init`, `open`, `discover`, `HEAD`, and
//! the commit identity taken from the environment and `.git/config`.

mod discover;
mod error;
mod identity;
mod init;

pub use error::RepoError;
pub use identity::{Identities, Role};

use std::fs;
use std::path::{Path, PathBuf};

use git_hash::ObjectId;
use git_loose::LooseObjectStore;
use tracing::debug;

/// What `HEAD` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// `ref: <name>`, possibly to a branch that does not exist yet.
    Symbolic(String),
    /// A raw object id.
    Detached(ObjectId),
}

/// An opened repository: its `.git` directory, working tree, and object store.
#[derive(Debug, Clone)]
pub struct Repository {
    git_dir: PathBuf,
    work_tree: Option<PathBuf>,
    objects: LooseObjectStore,
}

impl Repository {
    /// Create `<path>/.git` with `HEAD`, `config`, `objects/` and `refs/`.
    ///
    /// Running this on an existing repository leaves it untouched.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        init::init_repository(path.as_ref())
    }

    /// Open a known `.git` directory.
    pub fn open(git_dir: impl AsRef<Path>) -> Result<Self, RepoError> {
        discover::open_git_dir(git_dir.as_ref())
    }

    /// Find the repository containing `start` by walking up its parents.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        discover::discover_git_dir(start.as_ref())
    }

    fn from_parts(git_dir: PathBuf, work_tree: Option<PathBuf>) -> Self {
        let objects = LooseObjectStore::open(git_dir.join("objects"));
        Self {
            git_dir,
            work_tree,
            objects,
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The directory above `.git`; `None` for a bare layout.
    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    pub fn objects(&self) -> &LooseObjectStore {
        &self.objects
    }

    /// Parse the `HEAD` file.
    pub fn head(&self) -> Result<Head, RepoError> {
        let raw = fs::read_to_string(self.git_dir.join("HEAD"))?;
        let line = raw.trim_end();
        if let Some(target) = line.strip_prefix("ref: ") {
            return Ok(Head::Symbolic(target.to_string()));
        }
        ObjectId::from_hex(line)
            .map(Head::Detached)
            .map_err(|_| RepoError::InvalidHead(line.to_string()))
    }

    /// Resolve `HEAD` to an object id, or `None` on an unborn branch.
    pub fn head_id(&self) -> Result<Option<ObjectId>, RepoError> {
        match self.head()? {
            Head::Detached(oid) => Ok(Some(oid)),
            Head::Symbolic(name) => self.read_ref(&name),
        }
    }

    /// Read a loose ref such as `refs/heads/main`.
    pub fn read_ref(&self, name: &str) -> Result<Option<ObjectId>, RepoError> {
        check_ref_name(name)?;
        match fs::read_to_string(self.git_dir.join(name)) {
            Ok(raw) => Ok(Some(ObjectId::from_hex(raw.trim_end())?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record a fetched `HEAD`.
    ///
    /// With a branch name, the branch file receives `oid` and `HEAD` becomes
    /// `ref: <branch>`. Without one, `HEAD` is detached at `oid`.
    pub fn update_head(&self, branch: Option<&str>, oid: ObjectId) -> Result<(), RepoError> {
        match branch {
            Some(name) => {
                check_ref_name(name)?;
                let path = self.git_dir.join(name);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, format!("{oid}\n"))?;
                fs::write(self.git_dir.join("HEAD"), format!("ref: {name}\n"))?;
                debug!(%oid, branch = name, "updated HEAD");
            }
            None => {
                fs::write(self.git_dir.join("HEAD"), format!("{oid}\n"))?;
                debug!(%oid, "detached HEAD");
            }
        }
        Ok(())
    }

    /// Identities for commit construction, from the environment and `.git/config`.
    pub fn identities(&self) -> Identities {
        Identities::from_env(Some(&self.git_dir.join("config")))
    }
}

/// Accept only names under `refs/` that stay inside the git directory.
fn check_ref_name(name: &str) -> Result<(), RepoError> {
    let valid = name.starts_with("refs/")
        && !name.ends_with('/')
        && name
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
        && !name.bytes().any(|b| b.is_ascii_control() || b == b'\\');
    if valid {
        Ok(())
    } else {
        Err(RepoError::InvalidRefName(name.to_string()))
    }
}
