use std::path::{Path, PathBuf};

use crate::{RepoError, Repository};

/// Walk up from `start` until a directory holding `.git/HEAD` is found.
pub(crate) fn discover_git_dir(start: &Path) -> Result<Repository, RepoError> {
    let start =
        std::fs::canonicalize(start).map_err(|_| RepoError::NotFound(start.to_path_buf()))?;

    let mut current = start.as_path();
    loop {
        let dot_git = current.join(".git");
        if is_git_dir(&dot_git) {
            return Ok(Repository::from_parts(dot_git, Some(current.to_path_buf())));
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Err(RepoError::NotFound(start.clone())),
        }
    }
}

/// Open a `.git` directory directly.
pub(crate) fn open_git_dir(git_dir: &Path) -> Result<Repository, RepoError> {
    let git_dir = std::fs::canonicalize(git_dir)
        .map_err(|_| RepoError::NotFound(git_dir.to_path_buf()))?;

    if !is_git_dir(&git_dir) {
        return Err(RepoError::InvalidGitDir {
            path: git_dir,
            reason: "missing HEAD, objects/, or refs/".to_string(),
        });
    }

    let work_tree = match git_dir.file_name() {
        Some(name) if name == ".git" => git_dir.parent().map(PathBuf::from),
        _ => None,
    };
    Ok(Repository::from_parts(git_dir, work_tree))
}

fn is_git_dir(path: &Path) -> bool {
    path.join("HEAD").is_file() && path.join("objects").is_dir() && path.join("refs").is_dir()
}
