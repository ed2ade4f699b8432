use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct InitArgs {
    /// Be quiet, only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Directory to create the repository in
    directory: Option<PathBuf>,
}

pub fn run(args: &InitArgs) -> Result<i32> {
    let target = match &args.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let repo = git_repository::Repository::init(&target)?;

    if !args.quiet {
        let git_dir = std::fs::canonicalize(repo.git_dir())
            .unwrap_or_else(|_| repo.git_dir().to_path_buf());
        let mut display_path = git_dir.display().to_string();
        if !display_path.ends_with('/') {
            display_path.push('/');
        }
        writeln!(io::stderr(), "Initialized empty Git repository in {display_path}")?;
    }

    Ok(0)
}
