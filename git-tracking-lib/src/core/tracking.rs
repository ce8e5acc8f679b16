//! Resolve which remote branch a local branch tracks.

use tracing::{instrument, warn};

use crate::core::error::Result;
use crate::git::{branch_merge_key, branch_remote_key, ReferenceName, Vcs};

/// A local branch's configured upstream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackingRelationship {
    /// The short name of the local branch.
    pub branch_name: String,

    /// The remote it tracks. This is `.` when it tracks another local branch.
    pub remote_name: String,

    /// The short name of the branch on the remote.
    pub remote_branch_name: String,
}

impl TrackingRelationship {
    /// The reference for the local branch.
    pub fn local_reference(&self) -> ReferenceName {
        ReferenceName::local_branch(&self.branch_name)
    }

    /// The remote-tracking reference recording where the upstream was as of
    /// the last fetch.
    pub fn remote_reference(&self) -> ReferenceName {
        ReferenceName::remote_tracking(&self.remote_name, &self.remote_branch_name)
    }

    /// A short human-readable name for the upstream, like `origin/master`.
    pub fn friendly_upstream(&self) -> String {
        format!("{}/{}", self.remote_name, self.remote_branch_name)
    }
}

/// The result of resolving a branch's upstream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tracking {
    /// The branch has a complete tracking relationship.
    Tracked(TrackingRelationship),

    /// The branch tracks nothing, or only half of the relationship is
    /// configured.
    Untracked,
}

/// Remove a leading `refs/heads/` from a configured merge value.
pub fn strip_branch_prefix(merge_value: &str) -> &str {
    merge_value
        .strip_prefix("refs/heads/")
        .unwrap_or(merge_value)
}

/// Read the tracking configuration for `branch_name`. Read-only.
#[instrument(skip(vcs))]
pub fn resolve(vcs: &dyn Vcs, branch_name: &str) -> Result<Tracking> {
    let remote_name = vcs.get_config(&branch_remote_key(branch_name))?;
    let merge_value = vcs.get_config(&branch_merge_key(branch_name))?;
    match (remote_name, merge_value) {
        (Some(remote_name), Some(merge_value)) => {
            Ok(Tracking::Tracked(TrackingRelationship {
                branch_name: branch_name.to_owned(),
                remote_name,
                remote_branch_name: strip_branch_prefix(&merge_value).to_owned(),
            }))
        }
        (None, None) => Ok(Tracking::Untracked),
        (remote_name, merge_value) => {
            warn!(
                ?branch_name,
                ?remote_name,
                ?merge_value,
                "Branch has a partial tracking configuration; treating as untracked"
            );
            Ok(Tracking::Untracked)
        }
    }
}
