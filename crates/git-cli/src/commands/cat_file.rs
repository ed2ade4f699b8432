use std::io::{self, Write};

use anyhow::Result;
use clap::{ArgGroup, Args};
use git_object::{ObjectType, Tree};

use super::{ls_tree, open_repo, parse_oid};

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["type_only", "size", "pretty"])))]
pub struct CatFileArgs {
    /// Show object type
    #[arg(short = 't')]
    type_only: bool,

    /// Show object size
    #[arg(short = 's')]
    size: bool,

    /// Pretty-print the object content
    #[arg(short = 'p')]
    pretty: bool,

    /// Object id
    object: String,
}

pub fn run(args: &CatFileArgs) -> Result<i32> {
    let repo = open_repo()?;
    let oid = parse_oid(&args.object)?;
    let (kind, payload) = repo.objects().get(&oid)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.type_only {
        writeln!(out, "{kind}")?;
    } else if args.size {
        writeln!(out, "{}", payload.len())?;
    } else if kind == ObjectType::Tree {
        ls_tree::write_entries(&Tree::parse(&payload)?, &mut out)?;
    } else {
        out.write_all(&payload)?;
    }
    Ok(0)
}
