use std::fs;
use std::path::{Path, PathBuf};

use bstr::{BString, ByteVec};
use git_hash::ObjectId;
use git_object::{FileMode, ObjectType, Tree, TreeEntry};
use tracing::{debug, trace};

use crate::{LooseError, LooseObjectStore};

/// Directory names never included in a snapshot.
const EXCLUDED: &[&str] = &[".git"];

impl LooseObjectStore {
    /// Store every file under `dir` as a blob and every directory as a
    /// tree, returning the id of the top-level tree.
    ///
    /// Children are written before their parent. Entries are emitted in
    /// git's canonical order. Empty subdirectories are left out. A symlink
    /// that resolves to a directory is walked; any other symlink is stored
    /// as a link blob holding its target. That includes links that do not
    /// resolve at all, such as dangling ones or a loop like `x -> x`,
    /// matching `git add`. Walking into a directory that is already open
    /// further up the current path fails with
    /// [`LooseError::CircularStructure`].
    pub fn write_tree_from_directory(&self, dir: &Path) -> Result<ObjectId, LooseError> {
        let mut open = Vec::new();
        let (oid, _) = self.snapshot_dir(dir, &mut open)?;
        debug!(%oid, path = %dir.display(), "wrote tree from directory");
        Ok(oid)
    }

    /// Returns the tree id and whether the tree has any entries.
    fn snapshot_dir(
        &self,
        dir: &Path,
        open: &mut Vec<PathBuf>,
    ) -> Result<(ObjectId, bool), LooseError> {
        let real = fs::canonicalize(dir).map_err(|source| LooseError::Path {
            path: dir.to_path_buf(),
            source,
        })?;
        if open.contains(&real) {
            return Err(LooseError::CircularStructure { path: real });
        }
        open.push(real);
        let result = self.snapshot_entries(dir, open);
        open.pop();
        result
    }

    fn snapshot_entries(
        &self,
        dir: &Path,
        open: &mut Vec<PathBuf>,
    ) -> Result<(ObjectId, bool), LooseError> {
        let listing = fs::read_dir(dir).map_err(|source| LooseError::Path {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut tree = Tree::new();
        for entry in listing {
            let entry = entry?;
            let file_name = entry.file_name();
            if EXCLUDED.iter().any(|x| file_name == **x) {
                continue;
            }
            let name = BString::from(Vec::from_os_str_lossy(&file_name).into_owned());
            let path = entry.path();

            if let Some((mode, oid)) = self.snapshot_entry(&path, open)? {
                trace!(%oid, name = %name, "snapshot entry");
                tree.push(TreeEntry { mode, name, oid });
            }
        }

        tree.sort();
        let oid = self.put(ObjectType::Tree, &tree.serialize())?;
        Ok((oid, !tree.is_empty()))
    }

    fn snapshot_entry(
        &self,
        path: &Path,
        open: &mut Vec<PathBuf>,
    ) -> Result<Option<(FileMode, ObjectId)>, LooseError> {
        let io_err = |source| LooseError::Path {
            path: path.to_path_buf(),
            source,
        };
        let meta = fs::symlink_metadata(path).map_err(io_err)?;

        if meta.file_type().is_symlink() {
            // Follow only when the target is a directory. Unresolvable
            // links fall through and are stored as written.
            if fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false) {
                return self.snapshot_subtree(path, open);
            }
            let target = fs::read_link(path).map_err(io_err)?;
            let oid = self.put(ObjectType::Blob, &Vec::from_path_lossy(&target))?;
            return Ok(Some((FileMode::Symlink, oid)));
        }

        if meta.is_dir() {
            return self.snapshot_subtree(path, open);
        }

        let data = fs::read(path).map_err(io_err)?;
        let oid = self.put(ObjectType::Blob, &data)?;
        Ok(Some((file_mode(&meta), oid)))
    }

    fn snapshot_subtree(
        &self,
        path: &Path,
        open: &mut Vec<PathBuf>,
    ) -> Result<Option<(FileMode, ObjectId)>, LooseError> {
        let (oid, has_entries) = self.snapshot_dir(path, open)?;
        Ok(has_entries.then_some((FileMode::Tree, oid)))
    }
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> FileMode {
    use std::os::unix::fs::PermissionsExt;
    if meta.permissions().mode() & 0o111 != 0 {
        FileMode::Executable
    } else {
        FileMode::Regular
    }
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> FileMode {
    FileMode::Regular
}

#[cfg(test)]
mod tests {
    use bstr::ByteSlice;

    use super::*;

    fn names(tree: &Tree) -> Vec<String> {
        tree.iter().map(|e| e.name.to_str_lossy().into_owned()).collect()
    }

    #[test]
    fn flat_directory() {
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        fs::write(work.path().join("hello.txt"), b"hello world").unwrap();
        fs::write(work.path().join("b.txt"), b"b").unwrap();

        let store = LooseObjectStore::open(objects.path());
        let oid = store.write_tree_from_directory(work.path()).unwrap();
        let tree = store.read_tree(&oid).unwrap();
        assert_eq!(names(&tree), ["b.txt", "hello.txt"]);
        assert_eq!(
            tree.entries[1].oid.to_hex(),
            "95d09f2b10159347eece71399a7e2e907ea3df4f"
        );
    }

    #[test]
    fn nested_and_excluded() {
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        fs::create_dir_all(work.path().join("sub/deeper")).unwrap();
        fs::create_dir_all(work.path().join(".git/objects")).unwrap();
        fs::create_dir_all(work.path().join("empty")).unwrap();
        fs::write(work.path().join("sub/deeper/f"), b"f").unwrap();
        fs::write(work.path().join(".git/HEAD"), b"ref: refs/heads/main\n").unwrap();

        let store = LooseObjectStore::open(objects.path());
        let root = store.read_tree(&store.write_tree_from_directory(work.path()).unwrap()).unwrap();
        assert_eq!(names(&root), ["sub"]);
        assert_eq!(root.entries[0].mode, FileMode::Tree);

        let sub = store.read_tree(&root.entries[0].oid).unwrap();
        assert_eq!(names(&sub), ["deeper"]);
    }

    #[test]
    fn empty_directory_is_empty_tree() {
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::open(objects.path());
        let oid = store.write_tree_from_directory(work.path()).unwrap();
        assert_eq!(oid.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit() {
        use std::os::unix::fs::PermissionsExt;
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        let script = work.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let store = LooseObjectStore::open(objects.path());
        let tree = store.read_tree(&store.write_tree_from_directory(work.path()).unwrap()).unwrap();
        assert_eq!(tree.entries[0].mode, FileMode::Executable);
    }

    #[cfg(unix)]
    #[test]
    fn file_symlink_stored_as_link() {
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        fs::write(work.path().join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink("target.txt", work.path().join("link")).unwrap();

        let store = LooseObjectStore::open(objects.path());
        let tree = store.read_tree(&store.write_tree_from_directory(work.path()).unwrap()).unwrap();
        let link = tree.find(b"link".as_bstr()).unwrap();
        assert_eq!(link.mode, FileMode::Symlink);
        assert_eq!(store.get(&link.oid).unwrap().1, b"target.txt");
    }

    #[cfg(unix)]
    #[test]
    fn self_referential_symlink_is_circular() {
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        fs::create_dir(work.path().join("a")).unwrap();
        std::os::unix::fs::symlink("..", work.path().join("a/up")).unwrap();

        let store = LooseObjectStore::open(objects.path());
        let err = store.write_tree_from_directory(work.path()).unwrap_err();
        assert!(matches!(err, LooseError::CircularStructure { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_sibling_directory_is_walked() {
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        fs::create_dir(work.path().join("real")).unwrap();
        fs::write(work.path().join("real/f"), b"f").unwrap();
        std::os::unix::fs::symlink("real", work.path().join("alias")).unwrap();

        let store = LooseObjectStore::open(objects.path());
        let tree = store.read_tree(&store.write_tree_from_directory(work.path()).unwrap()).unwrap();
        let alias = tree.find(b"alias".as_bstr()).unwrap();
        let real = tree.find(b"real".as_bstr()).unwrap();
        assert_eq!(alias.mode, FileMode::Tree);
        assert_eq!(alias.oid, real.oid);
    }

    #[cfg(unix)]
    #[test]
    fn looping_symlinks_stored_as_links() {
        let work = tempfile::tempdir().unwrap();
        let objects = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("x", work.path().join("x")).unwrap();
        std::os::unix::fs::symlink("b", work.path().join("a")).unwrap();
        std::os::unix::fs::symlink("a", work.path().join("b")).unwrap();
        std::os::unix::fs::symlink("missing", work.path().join("dangling")).unwrap();

        let store = LooseObjectStore::open(objects.path());
        let tree = store.read_tree(&store.write_tree_from_directory(work.path()).unwrap()).unwrap();
        assert_eq!(names(&tree), ["a", "b", "dangling", "x"]);
        for (name, target) in [("x", "x"), ("a", "b"), ("b", "a"), ("dangling", "missing")] {
            let entry = tree.find(name.as_bytes().as_bstr()).unwrap();
            assert_eq!(entry.mode, FileMode::Symlink, "{name}");
            assert_eq!(store.get(&entry.oid).unwrap().1, target.as_bytes(), "{name}");
        }
    }
}
