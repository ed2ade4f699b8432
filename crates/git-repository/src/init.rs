use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{RepoError, Repository};

const DEFAULT_HEAD: &str = "ref: refs/heads/main\n";

const DEFAULT_CONFIG: &str = "[core]\n\trepositoryformatversion = 0\n\tbare = false\n";

/// Create the `.git` skeleton under `path`:
/// - HEAD (`ref: refs/heads/main`)
/// - config
/// - objects/
/// - refs/heads/
/// - refs/tags/
pub(crate) fn init_repository(path: &Path) -> Result<Repository, RepoError> {
    let path = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };
    let git_dir = path.join(".git");

    if git_dir.join("HEAD").is_file() {
        debug!(git_dir = %git_dir.display(), "reinitialized existing repository");
        return Ok(Repository::from_parts(git_dir, Some(path)));
    }

    fs::create_dir_all(git_dir.join("objects"))?;
    fs::create_dir_all(git_dir.join("refs").join("heads"))?;
    fs::create_dir_all(git_dir.join("refs").join("tags"))?;
    fs::write(git_dir.join("HEAD"), DEFAULT_HEAD)?;
    fs::write(git_dir.join("config"), DEFAULT_CONFIG)?;

    debug!(git_dir = %git_dir.display(), "initialized empty repository");
    Ok(Repository::from_parts(git_dir, Some(path)))
}
