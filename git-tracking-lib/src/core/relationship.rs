//! Measure how far a local branch and its upstream have drifted apart.

use tracing::instrument;

use crate::core::error::Result;
use crate::git::{ReferenceName, Vcs};

/// How two histories relate. Computed fresh on every call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RelationshipSummary {
    /// Commits reachable from the local ref but not the remote ref.
    pub ahead_count: usize,

    /// Commits reachable from the remote ref but not the local ref.
    pub behind_count: usize,

    /// Whether any commit counted in `ahead_count` is a merge commit.
    pub has_local_merge_commits: bool,

    /// Whether the remote-tracking ref exists at all. When `false`, every
    /// other field is zero and must not be read as "up to date".
    pub remote_ref_exists: bool,
}

impl RelationshipSummary {
    /// The summary for a remote ref which has never been fetched.
    pub fn missing_remote() -> Self {
        Self {
            ahead_count: 0,
            behind_count: 0,
            has_local_merge_commits: false,
            remote_ref_exists: false,
        }
    }
}

/// Compare `local` against `remote` by walking the commit graph.
#[instrument(skip(vcs))]
pub fn analyze(
    vcs: &dyn Vcs,
    local: &ReferenceName,
    remote: &ReferenceName,
) -> Result<RelationshipSummary> {
    if !vcs.ref_exists(remote)? {
        return Ok(RelationshipSummary::missing_remote());
    }

    let ahead_count = vcs.commits_only_in(local, remote)?;
    let behind_count = vcs.commits_only_in(remote, local)?;
    let has_local_merge_commits = ahead_count > 0 && vcs.has_multi_parent_commit(local, remote)?;
    Ok(RelationshipSummary {
        ahead_count,
        behind_count,
        has_local_merge_commits,
        remote_ref_exists: true,
    })
}
