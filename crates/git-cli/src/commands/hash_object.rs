use std::io::{self, Read, Write};

use anyhow::Result;
use clap::Args;
use git_hash::ObjectId;
use git_object::ObjectType;

use super::open_repo;

#[derive(Args)]
pub struct HashObjectArgs {
    /// Read the object from stdin
    #[arg(long)]
    stdin: bool,

    /// Actually write the object into the object database
    #[arg(short = 'w')]
    write: bool,

    /// Object type (default: blob)
    #[arg(short = 't', default_value = "blob")]
    obj_type: ObjectType,

    /// Files to hash
    #[arg(value_name = "file")]
    files: Vec<String>,
}

pub fn run(args: &HashObjectArgs) -> Result<i32> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // A repository is only needed when writing.
    let repo = if args.write { Some(open_repo()?) } else { None };

    if args.stdin {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        let oid = hash_and_maybe_write(&data, args.obj_type, repo.as_ref())?;
        writeln!(out, "{oid}")?;
    }

    for file in &args.files {
        let data = std::fs::read(file)?;
        let oid = hash_and_maybe_write(&data, args.obj_type, repo.as_ref())?;
        writeln!(out, "{oid}")?;
    }

    Ok(0)
}

fn hash_and_maybe_write(
    data: &[u8],
    obj_type: ObjectType,
    repo: Option<&git_repository::Repository>,
) -> Result<ObjectId> {
    match repo {
        Some(repo) => Ok(repo.objects().put(obj_type, data)?),
        None => Ok(git_object::hash_object(obj_type, data)?),
    }
}
