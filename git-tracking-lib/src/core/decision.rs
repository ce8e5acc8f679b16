//! Choose the single action which brings a branch back in line with its
//! upstream.
//!
//! [`decide`] is pure: it sees only a [`RelationshipSummary`] and a
//! [`SyncPolicy`], and every command which updates a branch from its upstream
//! goes through it. Commands differ only in the policy they pass and in what
//! they do with the resulting [`SyncDecision`].

use crate::core::relationship::RelationshipSummary;

/// Behavior selected by flags and configuration for a single invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Rebase clean linear local work instead of merging.
    pub prefer_rebase: bool,

    /// Only report branches which track something.
    pub remote_only: bool,

    /// Fetch before comparing.
    pub do_fetch: bool,

    /// Bring branches which are behind up to date.
    pub do_pull: bool,

    /// Stash uncommitted changes around the whole operation.
    pub do_stash: bool,

    /// Never create merge commits or rewrite history: diverged branches are
    /// reported instead of reconciled.
    pub fast_forward_only: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            prefer_rebase: true,
            remote_only: false,
            do_fetch: false,
            do_pull: false,
            do_stash: false,
            fast_forward_only: false,
        }
    }
}

/// What to do with a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncDecision {
    /// Nothing to pull.
    UpToDate,

    /// Move the branch forward to the upstream. Never creates a merge commit.
    FastForward,

    /// Replay local commits onto the upstream.
    Rebase,

    /// Merge the upstream into the branch.
    Merge,

    /// Both sides have new commits and the policy forbids reconciling them.
    DivergedAbort,

    /// The branch tracks nothing.
    Untracked,

    /// The upstream's remote-tracking ref has never been fetched.
    NonExistentRemoteRef,
}

/// Apply the decision table to `summary` under `policy`.
pub fn decide(summary: &RelationshipSummary, policy: &SyncPolicy) -> SyncDecision {
    let RelationshipSummary {
        ahead_count,
        behind_count,
        has_local_merge_commits,
        remote_ref_exists,
    } = *summary;

    if !remote_ref_exists {
        SyncDecision::NonExistentRemoteRef
    } else if behind_count == 0 {
        SyncDecision::UpToDate
    } else if ahead_count == 0 {
        SyncDecision::FastForward
    } else if policy.fast_forward_only {
        SyncDecision::DivergedAbort
    } else if policy.prefer_rebase && !has_local_merge_commits {
        SyncDecision::Rebase
    } else {
        SyncDecision::Merge
    }
}
