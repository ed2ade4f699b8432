use std::io::{self, Write};

use anyhow::Result;
use bstr::ByteSlice;
use clap::Args;
use git_object::{FileMode, Tree, TreeEntry};

use super::{open_repo, parse_oid};

#[derive(Args)]
pub struct LsTreeArgs {
    /// List only file names
    #[arg(long)]
    name_only: bool,

    /// Tree object id
    tree: String,
}

pub fn run(args: &LsTreeArgs) -> Result<i32> {
    let repo = open_repo()?;
    let tree = repo.objects().read_tree(&parse_oid(&args.tree)?)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.name_only {
        for entry in tree.iter() {
            out.write_all(&entry.name)?;
            out.write_all(b"\n")?;
        }
    } else {
        write_entries(&tree, &mut out)?;
    }
    Ok(0)
}

/// The kind an entry's mode implies.
fn entry_kind(mode: FileMode) -> &'static str {
    match mode {
        FileMode::Tree => "tree",
        FileMode::Gitlink => "commit",
        _ => "blob",
    }
}

fn format_entry(entry: &TreeEntry) -> String {
    format!(
        "{:06o} {} {}\t{}",
        entry.mode.raw(),
        entry_kind(entry.mode),
        entry.oid,
        entry.name.to_str_lossy()
    )
}

/// `<mode> <kind> <id>\t<name>` per entry, as `git ls-tree` prints them.
pub fn write_entries(tree: &Tree, out: &mut impl Write) -> Result<()> {
    for entry in tree.iter() {
        writeln!(out, "{}", format_entry(entry))?;
    }
    Ok(())
}
