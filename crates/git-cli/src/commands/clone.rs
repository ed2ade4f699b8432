use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use git_object::ObjectType;
use git_protocol::CloneOptions;
use tracing::debug;

#[derive(Args)]
pub struct CloneArgs {
    /// Verify the pack checksum before unpacking
    #[arg(long)]
    strict: bool,

    /// Give up connecting after this many seconds
    #[arg(long, value_name = "seconds")]
    timeout: Option<u64>,

    /// Be quiet, only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Remote repository URL (http:// or https://)
    url: String,

    /// Directory to clone into
    directory: Option<PathBuf>,
}

pub fn run(args: &CloneArgs) -> Result<i32> {
    let dest = match &args.directory {
        Some(dir) => dir.clone(),
        None => PathBuf::from(humanish_name(&args.url)?),
    };
    if dest.exists() && dest.read_dir()?.next().is_some() {
        bail!(
            "destination path '{}' already exists and is not an empty directory",
            dest.display()
        );
    }

    if !args.quiet {
        writeln!(io::stderr(), "Cloning into '{}'...", dest.display())?;
    }

    let mut options = CloneOptions::default();
    options.unpack.verify_checksum = args.strict;
    options.http.connect_timeout = args.timeout.map(Duration::from_secs);
    let outcome = git_protocol::clone(&args.url, &dest, &options)?;
    debug!(
        head = %outcome.head,
        objects = outcome.summary.objects,
        dest = %dest.display(),
        "clone finished"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "HEAD {}", outcome.head)?;
    let (kind, payload) = outcome.repository.objects().get(&outcome.head)?;
    if kind == ObjectType::Commit {
        writeln!(out, "tree {}", git_object::commit_tree(&payload)?)?;
    }
    Ok(0)
}

/// The directory name `git clone` would pick: the last path segment,
/// without a trailing `.git`.
fn humanish_name(url: &str) -> Result<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name.contains(':') {
        bail!("cannot guess a directory name from '{url}'; pass one explicitly");
    }
    Ok(name.to_string())
}
