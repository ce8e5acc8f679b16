//! Report how every local branch relates to its upstream.

use cursive_core::theme::{BaseColor, Effect, Style};
use cursive_core::utils::markup::StyledString;
use lazy_static::lazy_static;
use tracing::{instrument, warn};

use crate::core::decision::{decide, SyncDecision, SyncPolicy};
use crate::core::effects::{Effects, OperationType};
use crate::core::error::Result;
use crate::core::formatting::{Glyphs, StyledStringBuilder};
use crate::core::relationship::{analyze, RelationshipSummary};
use crate::core::sync::with_stash;
use crate::core::tracking::{resolve, Tracking, TrackingRelationship};
use crate::git::{ReferenceName, UpdateOutcome, Vcs};

lazy_static! {
    static ref STYLE_CURRENT_BRANCH: Style =
        Style::merge(&[BaseColor::Green.light().into(), Effect::Bold.into()]);
    static ref STYLE_DIVERGED: Style =
        Style::merge(&[BaseColor::Red.light().into(), Effect::Bold.into()]);
}

/// How a single branch relates to its upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchStatus {
    /// The branch tracks nothing.
    Untracked,

    /// The branch tracks a remote branch which has not been fetched.
    NonExistentRemote,

    /// Both sides have commits the other lacks.
    Diverged {
        /// Commits only on the local branch.
        ahead_count: usize,
        /// Commits only on the upstream.
        behind_count: usize,
    },

    /// The upstream has commits the local branch lacks.
    Behind {
        /// Commits only on the upstream.
        behind_count: usize,
    },

    /// The local branch has commits the upstream lacks.
    Ahead {
        /// Commits only on the local branch.
        ahead_count: usize,
    },

    /// Both point at the same history.
    UpToDate,
}

impl From<&RelationshipSummary> for BranchStatus {
    fn from(summary: &RelationshipSummary) -> Self {
        let RelationshipSummary {
            ahead_count,
            behind_count,
            has_local_merge_commits: _,
            remote_ref_exists,
        } = *summary;
        match (remote_ref_exists, ahead_count, behind_count) {
            (false, _, _) => BranchStatus::NonExistentRemote,
            (true, 0, 0) => BranchStatus::UpToDate,
            (true, ahead_count, 0) => BranchStatus::Ahead { ahead_count },
            (true, 0, behind_count) => BranchStatus::Behind { behind_count },
            (true, ahead_count, behind_count) => BranchStatus::Diverged {
                ahead_count,
                behind_count,
            },
        }
    }
}

/// One line of the report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchReport {
    /// The local branch.
    pub branch_name: String,

    /// Whether this branch is checked out.
    pub is_current: bool,

    /// The branch's upstream, if any.
    pub relationship: Option<TrackingRelationship>,

    /// The relationship to the upstream after any fast-forward.
    pub status: BranchStatus,

    /// Whether the branch was fast-forwarded while building the report.
    pub fast_forwarded: bool,
}

impl BranchReport {
    /// Render this line, padding the branch name to `name_width` columns.
    pub fn render(&self, glyphs: &Glyphs, name_width: usize) -> StyledString {
        let marker = if self.is_current {
            glyphs.current_branch
        } else {
            glyphs.other_branch
        };
        let name = format!("{:name_width$}", self.branch_name);
        let name_style = if self.is_current {
            *STYLE_CURRENT_BRANCH
        } else {
            Style::none()
        };

        let mut builder = StyledStringBuilder::new()
            .append_plain(format!("{marker} "))
            .append_styled(name, name_style);

        if let Some(relationship) = &self.relationship {
            builder = builder.append_plain(format!(" {} ", relationship.friendly_upstream()));
        }

        builder = match self.status {
            BranchStatus::Untracked => {
                builder.append_styled(" (untracked)", BaseColor::Black.light())
            }
            BranchStatus::NonExistentRemote => {
                builder.append_styled("(remote branch does not exist)", BaseColor::Red.light())
            }
            BranchStatus::Diverged {
                ahead_count,
                behind_count,
            } => builder.append_styled(
                format!(
                    "diverged ({}{ahead_count} {}{behind_count})",
                    glyphs.ahead, glyphs.behind
                ),
                *STYLE_DIVERGED,
            ),
            BranchStatus::Behind { behind_count } => builder.append_styled(
                format!("behind {}{behind_count}", glyphs.behind),
                BaseColor::Yellow.light(),
            ),
            BranchStatus::Ahead { ahead_count } => builder.append_styled(
                format!("ahead {}{ahead_count}", glyphs.ahead),
                BaseColor::Cyan.light(),
            ),
            BranchStatus::UpToDate => builder.append_plain("up to date"),
        };

        if self.fast_forwarded {
            builder = builder.append_styled(" (fast-forwarded)", BaseColor::Green.light());
        }
        builder.build()
    }
}

/// Render a whole report, one line per branch, aligning branch names.
pub fn render_report(glyphs: &Glyphs, reports: &[BranchReport]) -> Vec<StyledString> {
    let name_width = reports
        .iter()
        .map(|report| report.branch_name.chars().count())
        .max()
        .unwrap_or_default();
    reports
        .iter()
        .map(|report| report.render(glyphs, name_width))
        .collect()
}

/// Where `HEAD` was before the report started moving between branches.
enum OriginalHead {
    Branch(String),
    Detached(String),
}

/// Build the report for every local branch.
///
/// The checked-out branch comes first, then the rest in sorted order. With
/// `policy.do_fetch`, every remote is fetched before anything is compared.
/// With `policy.do_pull`, each branch which is strictly behind its upstream is
/// fast-forwarded (checking it out if necessary), and the original branch is
/// checked out again afterwards. With `policy.do_stash`, uncommitted changes
/// are stashed around the whole pass.
#[instrument(skip(vcs, effects))]
pub fn report_branches(
    vcs: &dyn Vcs,
    effects: &Effects,
    policy: &SyncPolicy,
) -> Result<Vec<BranchReport>> {
    let (effects, _progress) = effects.start_operation(OperationType::ReportBranches);
    let effects = &effects;
    with_stash(
        vcs,
        effects,
        policy.do_stash,
        || {
            if policy.do_fetch {
                let (_effects, _progress) = effects.start_operation(OperationType::FetchRemotes);
                for remote_name in vcs.remote_names()? {
                    vcs.fetch(&remote_name, None)?;
                }
            }

            let original_head = match vcs.current_branch()? {
                Some(branch_name) => OriginalHead::Branch(branch_name),
                None => match vcs.ref_target(&ReferenceName::from("HEAD"))? {
                    Some(oid) => OriginalHead::Detached(oid.to_string()),
                    None => OriginalHead::Detached("HEAD".to_owned()),
                },
            };
            let mut checked_out = match &original_head {
                OriginalHead::Branch(branch_name) => Some(branch_name.clone()),
                OriginalHead::Detached(_) => None,
            };

            let result = collect_reports(vcs, policy, &original_head, &mut checked_out);
            let moved = match (&original_head, &checked_out) {
                (OriginalHead::Branch(original), Some(current)) => original != current,
                (OriginalHead::Branch(_), None) => true,
                (OriginalHead::Detached(_), checked_out) => checked_out.is_some(),
            };
            if moved {
                let restore_result = match &original_head {
                    OriginalHead::Branch(branch_name) => vcs.checkout(branch_name),
                    OriginalHead::Detached(target) => vcs.checkout_detached(target),
                };
                match (&result, restore_result) {
                    (_, Ok(())) => {}
                    (Ok(_), Err(err)) => return Err(err),
                    (Err(_), Err(err)) => {
                        warn!(?err, "Could not return to the original branch");
                    }
                }
            }
            result
        },
        |_| false,
    )
}

fn collect_reports(
    vcs: &dyn Vcs,
    policy: &SyncPolicy,
    original_head: &OriginalHead,
    checked_out: &mut Option<String>,
) -> Result<Vec<BranchReport>> {
    let current_branch = match original_head {
        OriginalHead::Branch(branch_name) => Some(branch_name.as_str()),
        OriginalHead::Detached(_) => None,
    };
    let mut branch_names = vcs.local_branch_names()?;
    branch_names.sort();
    if let Some(current_branch) = current_branch {
        if let Some(index) = branch_names.iter().position(|name| name == current_branch) {
            let name = branch_names.remove(index);
            branch_names.insert(0, name);
        }
    }

    let ff_policy = SyncPolicy {
        fast_forward_only: true,
        ..*policy
    };

    let mut reports = Vec::new();
    for branch_name in branch_names {
        let is_current = Some(branch_name.as_str()) == current_branch;
        let relationship = match resolve(vcs, &branch_name)? {
            Tracking::Tracked(relationship) => relationship,
            Tracking::Untracked => {
                if !policy.remote_only {
                    reports.push(BranchReport {
                        branch_name,
                        is_current,
                        relationship: None,
                        status: BranchStatus::Untracked,
                        fast_forwarded: false,
                    });
                }
                continue;
            }
        };

        let local_reference = relationship.local_reference();
        let remote_reference = relationship.remote_reference();
        let mut summary = analyze(vcs, &local_reference, &remote_reference)?;
        let mut fast_forwarded = false;
        if policy.do_pull && decide(&summary, &ff_policy) == SyncDecision::FastForward {
            if checked_out.as_deref() != Some(branch_name.as_str()) {
                vcs.checkout(&branch_name)?;
                *checked_out = Some(branch_name.clone());
            }
            if vcs.merge_fast_forward_only(&remote_reference)? == UpdateOutcome::Updated {
                fast_forwarded = true;
                summary = analyze(vcs, &local_reference, &remote_reference)?;
            }
        }

        reports.push(BranchReport {
            branch_name,
            is_current,
            relationship: Some(relationship),
            status: BranchStatus::from(&summary),
            fast_forwarded,
        });
    }
    Ok(reports)
}
