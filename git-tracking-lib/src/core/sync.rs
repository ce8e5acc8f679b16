//! Bring the checked-out branch up to date with its upstream.

use std::fmt::Write;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::core::decision::{decide, SyncDecision, SyncPolicy};
use crate::core::effects::{Effects, OperationType};
use crate::core::error::{Error, Result};
use crate::core::formatting::Pluralize;
use crate::core::relationship::{analyze, RelationshipSummary};
use crate::core::tracking::{resolve, Tracking, TrackingRelationship};
use crate::git::{StashOutcome, UpdateOutcome, Vcs, LOCAL_REMOTE_NAME};
use crate::util::ExitCode;

/// The message recorded on stash entries created by this crate.
pub const STASH_LABEL: &str = "git-tracking: automatic stash";

/// What happened when syncing a branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The branch which was synced.
    pub relationship: TrackingRelationship,

    /// The relationship observed before acting.
    pub summary: RelationshipSummary,

    /// The action chosen.
    pub decision: SyncDecision,

    /// The result of the update, if one was attempted.
    pub update: Option<UpdateOutcome>,
}

impl SyncOutcome {
    /// The exit code to end the command with.
    pub fn exit_code(&self) -> ExitCode {
        match self.update {
            None | Some(UpdateOutcome::Updated) => ExitCode::success(),
            Some(UpdateOutcome::NotFastForward) | Some(UpdateOutcome::Conflict) => ExitCode(1),
        }
    }
}

/// Run `f` with uncommitted changes stashed away, if `enabled`.
///
/// The stash is restored afterwards whether or not `f` succeeds, unless `f`
/// reports that it stopped in the middle of a conflicted merge or rebase, in
/// which case the changes stay in the stash for the user to restore.
pub fn with_stash<T>(
    vcs: &dyn Vcs,
    effects: &Effects,
    enabled: bool,
    f: impl FnOnce() -> Result<T>,
    stopped_with_conflicts: impl Fn(&T) -> bool,
) -> Result<T> {
    if !enabled {
        return f();
    }

    let stash_outcome = vcs.stash_save(STASH_LABEL)?;
    let result = f();
    if stash_outcome == StashOutcome::NothingToStash {
        return result;
    }

    match &result {
        Ok(value) if stopped_with_conflicts(value) => {
            writeln!(
                effects.get_error_stream(),
                "Your uncommitted changes are still stashed; run `git stash pop` once the conflicts are resolved."
            )?;
            result
        }
        Ok(_) => {
            vcs.stash_pop()?;
            result
        }
        Err(_) => {
            if let Err(pop_err) = vcs.stash_pop() {
                warn!(?pop_err, "Could not restore stashed changes");
            }
            result
        }
    }
}

/// Sync the checked-out branch with its upstream under `policy`.
///
/// Domain failures (not on a branch, untracked, missing upstream, diverged
/// under fast-forward-only policy) are returned as errors. Conflicts are
/// reported through [`SyncOutcome::update`].
#[instrument(skip(vcs, effects))]
pub fn execute_sync(
    vcs: &dyn Vcs,
    effects: &Effects,
    policy: &SyncPolicy,
) -> Result<SyncOutcome> {
    let branch_name = vcs.current_branch()?.ok_or(Error::NotOnABranch)?;
    let relationship = match resolve(vcs, &branch_name)? {
        Tracking::Tracked(relationship) => relationship,
        Tracking::Untracked => return Err(Error::Untracked { branch_name }),
    };

    with_stash(
        vcs,
        effects,
        policy.do_stash,
        move || sync_branch(vcs, effects, relationship, policy),
        |outcome: &SyncOutcome| outcome.update == Some(UpdateOutcome::Conflict),
    )
}

fn sync_branch(
    vcs: &dyn Vcs,
    effects: &Effects,
    relationship: TrackingRelationship,
    policy: &SyncPolicy,
) -> Result<SyncOutcome> {
    let (effects, _progress) = effects.start_operation(OperationType::SyncBranch(Arc::new(
        relationship.branch_name.clone(),
    )));

    if policy.do_fetch && relationship.remote_name != LOCAL_REMOTE_NAME {
        vcs.fetch(
            &relationship.remote_name,
            Some(relationship.remote_branch_name.as_str()),
        )?;
    }

    let local_reference = relationship.local_reference();
    let remote_reference = relationship.remote_reference();
    let summary = {
        let (_effects, _progress) = effects.start_operation(OperationType::AnalyzeRelationship(
            Arc::new(relationship.branch_name.clone()),
        ));
        analyze(vcs, &local_reference, &remote_reference)?
    };
    let decision = decide(&summary, policy);
    let upstream = relationship.friendly_upstream();
    let branch_name = relationship.branch_name.as_str();

    let update = match decision {
        SyncDecision::UpToDate => {
            if summary.ahead_count > 0 {
                writeln!(
                    effects.get_output_stream(),
                    "{branch_name} is up to date with {upstream} (ahead by {})",
                    Pluralize {
                        determiner: None,
                        amount: summary.ahead_count,
                        unit: ("commit", "commits"),
                    }
                )?;
            } else {
                writeln!(
                    effects.get_output_stream(),
                    "{branch_name} is up to date with {upstream}"
                )?;
            }
            None
        }

        SyncDecision::FastForward => {
            writeln!(
                effects.get_output_stream(),
                "Fast-forwarding {branch_name} to {upstream} ({})",
                Pluralize {
                    determiner: None,
                    amount: summary.behind_count,
                    unit: ("new commit", "new commits"),
                }
            )?;
            let outcome = vcs.merge_fast_forward_only(&remote_reference)?;
            if outcome == UpdateOutcome::NotFastForward {
                // The upstream moved between the analysis and the update.
                return Err(Error::Diverged {
                    branch_name: branch_name.to_owned(),
                    ahead_count: summary.ahead_count,
                    behind_count: summary.behind_count,
                });
            }
            Some(outcome)
        }

        SyncDecision::Rebase => {
            writeln!(
                effects.get_output_stream(),
                "Rebasing {} from {branch_name} onto {upstream}",
                Pluralize {
                    determiner: None,
                    amount: summary.ahead_count,
                    unit: ("commit", "commits"),
                }
            )?;
            Some(vcs.rebase(&remote_reference)?)
        }

        SyncDecision::Merge => {
            writeln!(
                effects.get_output_stream(),
                "Merging {upstream} into {branch_name}{}",
                if summary.has_local_merge_commits {
                    " (local history contains merge commits)"
                } else {
                    ""
                }
            )?;
            Some(vcs.merge(&remote_reference)?)
        }

        SyncDecision::DivergedAbort => {
            return Err(Error::Diverged {
                branch_name: branch_name.to_owned(),
                ahead_count: summary.ahead_count,
                behind_count: summary.behind_count,
            })
        }

        SyncDecision::NonExistentRemoteRef => {
            return Err(Error::RemoteRefMissing {
                reference_name: remote_reference.to_string(),
            })
        }

        SyncDecision::Untracked => {
            return Err(Error::Untracked {
                branch_name: branch_name.to_owned(),
            })
        }
    };

    if update == Some(UpdateOutcome::Conflict) {
        let continue_command = match decision {
            SyncDecision::Rebase => "git rebase --continue",
            _ => "git commit",
        };
        writeln!(
            effects.get_error_stream(),
            "Stopped with conflicts while syncing {branch_name} with {upstream}; resolve them and run `{continue_command}`."
        )?;
    }

    Ok(SyncOutcome {
        relationship,
        summary,
        decision,
        update,
    })
}
