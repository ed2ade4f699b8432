//! Full clone over smart HTTP.
//!
//! 1. `GET info/refs` and parse the advertisement.
//! 2. `POST git-upload-pack` wanting the advertised `HEAD`.
//! 3. Strip side-band framing and unpack every object into the new store.
//! 4. Point `HEAD` (and its branch, when known) at the fetched commit.
//!
//! A failure part-way leaves whatever objects were already written; they are
//! content-addressed, so running the clone again simply fills in the rest.

use std::path::Path;

use git_hash::ObjectId;
use git_pack::{UnpackOptions, UnpackSummary};
use git_repository::Repository;
use git_transport::{GitUrl, HttpClient, HttpOptions, HttpResponse};
use tracing::{debug, info};

use crate::advertisement::{build_negotiation_request, Advertisement};
use crate::sideband::demux_pack;
use crate::ProtocolError;

/// Settings for [`clone`].
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub http: HttpOptions,
    pub unpack: UnpackOptions,
}

/// Result of a successful clone.
#[derive(Debug)]
pub struct CloneOutcome {
    /// The commit `HEAD` was advertised at.
    pub head: ObjectId,
    /// The branch `HEAD` now refers to; `None` when it was left detached.
    pub branch: Option<String>,
    pub summary: UnpackSummary,
    pub repository: Repository,
}

/// Clone `url` into a new repository at `dest`.
pub fn clone(
    url: &str,
    dest: impl AsRef<Path>,
    options: &CloneOptions,
) -> Result<CloneOutcome, ProtocolError> {
    let url = GitUrl::parse(url)?;
    let client = HttpClient::new(url.scheme, options.http.clone())?;
    clone_with(&client, &url, dest.as_ref(), &options.unpack)
}

/// [`clone`] with a caller-supplied client.
pub fn clone_with(
    client: &HttpClient,
    url: &GitUrl,
    dest: &Path,
    unpack_options: &UnpackOptions,
) -> Result<CloneOutcome, ProtocolError> {
    info!(%url, dest = %dest.display(), "cloning");
    let repository = Repository::init(dest)?;

    let refs_response = HttpResponse::parse(&client.get_refs(url)?)?;
    let advertisement = Advertisement::parse(&refs_response.body)?;
    let head = advertisement.head();
    debug!(%head, refs = advertisement.refs.len(), "remote HEAD");

    let request = build_negotiation_request(&head)?;
    let pack_response = HttpResponse::parse(&client.post_upload_pack(url, &request)?)?;
    let pack = demux_pack(&pack_response.body)?;
    debug!(bytes = pack.len(), "received pack");

    let summary = git_pack::unpack(&pack, repository.objects(), unpack_options)?;
    if !repository.objects().contains(&head) {
        return Err(ProtocolError::Protocol(format!(
            "pack did not contain the advertised HEAD {head}"
        )));
    }

    let branch = advertisement
        .head_branch()
        .filter(|name| name.starts_with("refs/heads/"))
        .map(str::to_string);
    repository.update_head(branch.as_deref(), head)?;
    info!(
        %head,
        objects = summary.objects,
        deltas = summary.deltas,
        "clone complete"
    );

    Ok(CloneOutcome {
        head,
        branch,
        summary,
        repository,
    })
}
