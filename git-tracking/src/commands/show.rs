//! Implements the `git tracking show` command.

use std::fmt::Write;

use lib::core::config::get_prefer_rebase;
use lib::core::decision::{decide, SyncDecision, SyncPolicy};
use lib::core::effects::Effects;
use lib::core::error::{Error, Result};
use lib::core::formatting::Pluralize;
use lib::core::relationship::{analyze, RelationshipSummary};
use lib::core::report::{render_report, BranchReport, BranchStatus};
use lib::core::tracking::{resolve, Tracking, TrackingRelationship};
use lib::git::{GitRunInfo, Repo, RepoVcs, Vcs};
use lib::try_exit_code;
use lib::util::EyreExitOr;
use tracing::instrument;

use super::handle_result;

/// What `git tracking pull` would do next, in words.
fn describe_next_pull(decision: SyncDecision, summary: &RelationshipSummary) -> String {
    match decision {
        SyncDecision::UpToDate => "nothing to pull".to_owned(),
        SyncDecision::FastForward => format!(
            "fast-forward by {}",
            Pluralize {
                determiner: None,
                amount: summary.behind_count,
                unit: ("commit", "commits"),
            }
        ),
        SyncDecision::Rebase => format!(
            "rebase {} onto the upstream",
            Pluralize {
                determiner: None,
                amount: summary.ahead_count,
                unit: ("local commit", "local commits"),
            }
        ),
        SyncDecision::Merge if summary.has_local_merge_commits => {
            "merge the upstream (local history contains merge commits)".to_owned()
        }
        SyncDecision::Merge => "merge the upstream".to_owned(),
        SyncDecision::DivergedAbort => "stop, since the branch has diverged".to_owned(),
        SyncDecision::NonExistentRemoteRef => "fetch the remote branch first".to_owned(),
        SyncDecision::Untracked => "set up tracking first".to_owned(),
    }
}

fn resolve_relationship(
    vcs: &dyn Vcs,
    branch: Option<String>,
) -> Result<(TrackingRelationship, bool)> {
    let current_branch = vcs.current_branch()?;
    let branch_name = match branch.or_else(|| current_branch.clone()) {
        Some(branch_name) => branch_name,
        None => return Err(Error::NotOnABranch),
    };
    let is_current = current_branch.as_deref() == Some(branch_name.as_str());
    match resolve(vcs, &branch_name)? {
        Tracking::Tracked(relationship) => Ok((relationship, is_current)),
        Tracking::Untracked => Err(Error::Untracked { branch_name }),
    }
}

/// Print the upstream of `branch` (or the current branch), how far apart the
/// two are, and what pulling would do.
#[instrument(skip(effects, git_run_info))]
pub fn show(
    effects: &Effects,
    git_run_info: &GitRunInfo,
    branch: Option<String>,
) -> EyreExitOr<()> {
    let repo = Repo::from_current_dir()?;
    let vcs = RepoVcs::new(effects, &repo, git_run_info);

    let (relationship, is_current) =
        try_exit_code!(handle_result(effects, resolve_relationship(&vcs, branch))?);
    let summary = try_exit_code!(handle_result(
        effects,
        analyze(
            &vcs,
            &relationship.local_reference(),
            &relationship.remote_reference()
        )
    )?);
    let policy = SyncPolicy {
        prefer_rebase: get_prefer_rebase(&repo)?,
        ..Default::default()
    };
    let decision = decide(&summary, &policy);

    let report = BranchReport {
        branch_name: relationship.branch_name.clone(),
        is_current,
        relationship: Some(relationship),
        status: BranchStatus::from(&summary),
        fast_forwarded: false,
    };
    let glyphs = effects.get_glyphs();
    for line in render_report(glyphs, &[report]) {
        writeln!(effects.get_output_stream(), "{}", glyphs.render(line)?)?;
    }
    writeln!(
        effects.get_output_stream(),
        "Next pull: {}",
        describe_next_pull(decision, &summary)
    )?;
    Ok(Ok(()))
}
