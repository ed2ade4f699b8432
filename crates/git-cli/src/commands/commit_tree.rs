use std::io::{self, Read, Write};

use anyhow::{bail, Result};
use bstr::BString;
use clap::Args;
use git_object::{CommitBuilder, ObjectType};

use super::{open_repo, parse_oid};

#[derive(Args)]
pub struct CommitTreeArgs {
    /// Tree object id
    tree: String,

    /// Parent commit(s)
    #[arg(short = 'p', num_args = 1)]
    parent: Vec<String>,

    /// Commit message; read from stdin when absent
    #[arg(short = 'm')]
    message: Option<String>,
}

pub fn run(args: &CommitTreeArgs) -> Result<i32> {
    let repo = open_repo()?;
    let store = repo.objects();

    let tree = parse_oid(&args.tree)?;
    let (kind, _) = store.get(&tree)?;
    if kind != ObjectType::Tree {
        bail!("{tree} is a {kind}, not a tree");
    }

    let parents = args
        .parent
        .iter()
        .map(|p| parse_oid(p))
        .collect::<Result<Vec<_>>>()?;
    for parent in &parents {
        if !store.contains(parent) {
            bail!("not a valid object name: {parent}");
        }
    }

    let message = match &args.message {
        Some(msg) => BString::from(msg.as_str()),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            BString::from(buf)
        }
    };

    let identities = repo.identities();
    let payload = CommitBuilder::new(tree, &identities.author, &identities.committer)
        .parents(parents)
        .message(message)
        .build();
    let oid = store.put(ObjectType::Commit, &payload)?;

    writeln!(io::stdout(), "{oid}")?;
    Ok(0)
}
