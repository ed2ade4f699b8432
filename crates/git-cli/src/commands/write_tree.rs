use std::io::{self, Write};

use anyhow::{bail, Result};
use clap::Args;
use tracing::debug;

use super::open_repo;

#[derive(Args)]
pub struct WriteTreeArgs {}

pub fn run(_args: &WriteTreeArgs) -> Result<i32> {
    let repo = open_repo()?;
    let Some(work_tree) = repo.work_tree() else {
        bail!("this operation must be run in a work tree");
    };

    let oid = repo.objects().write_tree_from_directory(work_tree)?;
    debug!(tree = %oid, root = %work_tree.display(), "snapshot written");
    writeln!(io::stdout(), "{oid}")?;
    Ok(0)
}
