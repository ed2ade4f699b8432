//! Shared harness for the `mgit` integration tests.
//!
//! Commands run with a pinned environment so ids and signatures are the
//! same on every machine.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured output from running a command.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub fn mgit_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mgit"))
}

fn pin_env(cmd: &mut Command, dir: &Path) {
    cmd.env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "1234567890 +0000")
        .env("GIT_COMMITTER_NAME", "Test Committer")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_DATE", "1234567890 +0000")
        .env("HOME", dir)
        .env_remove("RUST_LOG");
}

/// Run `mgit` in `dir`.
pub fn mgit(dir: &Path, args: &[&str]) -> CommandResult {
    mgit_stdin(dir, args, &[])
}

/// Run `mgit` in `dir`, feeding `stdin`.
pub fn mgit_stdin(dir: &Path, args: &[&str], stdin: &[u8]) -> CommandResult {
    let mut cmd = Command::new(mgit_bin());
    cmd.args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    pin_env(&mut cmd, dir);

    let mut child = cmd.spawn().expect("failed to spawn mgit");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin)
        .expect("failed to write stdin");
    let output = child.wait_with_output().expect("failed to wait for mgit");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}

/// Assert success and return trimmed stdout.
pub fn ok(result: CommandResult) -> String {
    assert_eq!(
        result.exit_code, 0,
        "command failed\nstdout: {}\nstderr: {}",
        result.stdout, result.stderr
    );
    result.stdout.trim_end().to_string()
}

/// A fresh repository with `hello.txt` and `sub/foo.txt` in the work tree.
pub fn setup_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    ok(mgit(dir.path(), &["init", "-q"]));
    std::fs::write(dir.path().join("hello.txt"), "hello world\n").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/foo.txt"), "foo\n").unwrap();
    dir
}
