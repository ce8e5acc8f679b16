//! Implements the `git tracking track` command.

use std::fmt::Write;

use lib::core::config::print_hint;
use lib::core::effects::Effects;
use lib::core::error::Error;
use lib::core::provision::{provision, ProvisionAction, ProvisionOptions, ProvisionOutcome};
use lib::git::{GitRunInfo, Repo, RepoVcs, Vcs};
use lib::try_exit_code;
use lib::util::EyreExitOr;
use tracing::instrument;

use super::{handle_result, report_error};

/// Command-line choices for `git tracking track`.
#[derive(Debug, Default)]
pub struct TrackOptions {
    pub start_point: Option<String>,
    pub marker: bool,
    pub reset: bool,
    pub new: bool,
    pub fetch: bool,
}

impl From<TrackOptions> for ProvisionOptions {
    fn from(options: TrackOptions) -> Self {
        let TrackOptions {
            start_point,
            marker,
            reset,
            new,
            fetch,
        } = options;
        ProvisionOptions {
            start_point,
            create_marker_commit: marker,
            rebind: reset,
            allow_missing_remote_branch: new,
            fetch,
        }
    }
}

fn describe_outcome(remote_name: &str, branch_name: &str, outcome: &ProvisionOutcome) -> String {
    let upstream = format!("{remote_name}/{branch_name}");
    let ProvisionOutcome {
        created: _,
        from,
        action,
    } = outcome;
    match action {
        ProvisionAction::AlreadyTracking => format!("{branch_name} already tracks {upstream}"),
        ProvisionAction::Adopted => format!("{branch_name} now tracks {upstream}"),
        ProvisionAction::Created => {
            format!("Created branch {branch_name} from {from}, tracking {upstream}")
        }
        ProvisionAction::Rebound => {
            format!("Reset branch {branch_name} to {from}, tracking {upstream}")
        }
    }
}

/// Make `branch` (or the current branch) track the branch of the same name on
/// `remote_name`.
#[instrument(skip(effects, git_run_info))]
pub fn track(
    effects: &Effects,
    git_run_info: &GitRunInfo,
    remote_name: &str,
    branch: Option<String>,
    options: TrackOptions,
) -> EyreExitOr<()> {
    let repo = Repo::from_current_dir()?;
    let vcs = RepoVcs::new(effects, &repo, git_run_info);

    let branch_name = match branch {
        Some(branch_name) => branch_name,
        None => try_exit_code!(handle_result(
            effects,
            vcs.current_branch()
                .and_then(|branch_name| branch_name.ok_or(Error::NotOnABranch))
        )?),
    };

    let outcome = match provision(
        &vcs,
        effects,
        remote_name,
        &branch_name,
        &ProvisionOptions::from(options),
    ) {
        Ok(outcome) => outcome,
        Err(err) => {
            let exit_code = report_error(effects, &err)?;
            if let Error::RemoteRefMissing { .. } = err {
                print_hint(
                    effects,
                    "pass --new to track a branch which hasn't been pushed yet",
                )?;
            }
            return Ok(Err(exit_code));
        }
    };
    writeln!(
        effects.get_output_stream(),
        "{}",
        describe_outcome(remote_name, &branch_name, &outcome)
    )?;
    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use lib::git::ReferenceName;

    #[test]
    fn test_describe_outcome() {
        let outcome = ProvisionOutcome {
            created: true,
            from: ReferenceName::from("refs/remotes/origin/feature"),
            action: ProvisionAction::Rebound,
        };
        assert_eq!(
            describe_outcome("origin", "feature", &outcome),
            "Reset branch feature to refs/remotes/origin/feature, tracking origin/feature"
        );
    }
}
