//! Implements the `git tracking pull` command.

use lib::core::config::{get_auto_stash, get_prefer_rebase};
use lib::core::decision::SyncPolicy;
use lib::core::effects::Effects;
use lib::core::sync::execute_sync;
use lib::git::{GitRunInfo, Repo, RepoVcs};
use lib::try_exit_code;
use lib::util::EyreExitOr;
use tracing::instrument;

use super::{finish, handle_result};

/// Fetch the current branch's upstream and integrate it, rebasing or merging
/// if the branch has diverged.
#[instrument(skip(effects, git_run_info))]
pub fn pull(
    effects: &Effects,
    git_run_info: &GitRunInfo,
    prefer_rebase: Option<bool>,
    fetch: bool,
    stash: Option<bool>,
) -> EyreExitOr<()> {
    let repo = Repo::from_current_dir()?;
    let policy = SyncPolicy {
        prefer_rebase: prefer_rebase.map_or_else(|| get_prefer_rebase(&repo), Ok)?,
        do_fetch: fetch,
        do_stash: stash.map_or_else(|| get_auto_stash(&repo), Ok)?,
        fast_forward_only: false,
        ..Default::default()
    };

    let vcs = RepoVcs::new(effects, &repo, git_run_info);
    let outcome = try_exit_code!(handle_result(
        effects,
        execute_sync(&vcs, effects, &policy)
    )?);
    finish(outcome.exit_code())
}
