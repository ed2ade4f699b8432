pub mod cat_file;
pub mod clone;
pub mod commit_tree;
pub mod hash_object;
pub mod init;
pub mod ls_tree;
pub mod write_tree;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use git_hash::ObjectId;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty repository
    Init(init::InitArgs),
    /// Provide content, type or size of a repository object
    CatFile(cat_file::CatFileArgs),
    /// Compute an object id and optionally store the object
    HashObject(hash_object::HashObjectArgs),
    /// List the contents of a tree object
    LsTree(ls_tree::LsTreeArgs),
    /// Snapshot the working directory as a tree object
    WriteTree(write_tree::WriteTreeArgs),
    /// Create a commit object from a tree
    CommitTree(commit_tree::CommitTreeArgs),
    /// Fetch a repository over smart HTTP into a new directory
    Clone(clone::CloneArgs),
}

/// Find the repository containing the current directory.
pub fn open_repo() -> Result<git_repository::Repository> {
    Ok(git_repository::Repository::discover(".")?)
}

/// A full 40-digit hex object id.
pub fn parse_oid(name: &str) -> Result<ObjectId> {
    ObjectId::from_hex(name).map_err(|_| anyhow!("not a valid object name: {name}"))
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::Init(args) => init::run(args),
        Commands::CatFile(args) => cat_file::run(args),
        Commands::HashObject(args) => hash_object::run(args),
        Commands::LsTree(args) => ls_tree::run(args),
        Commands::WriteTree(args) => write_tree::run(args),
        Commands::CommitTree(args) => commit_tree::run(args),
        Commands::Clone(args) => clone::run(args),
    }
}
