//! Implements the `git tracking sync` command.

use lib::core::config::{get_auto_stash, get_fetch_first, get_prefer_rebase};
use lib::core::decision::SyncPolicy;
use lib::core::effects::Effects;
use lib::core::sync::execute_sync;
use lib::git::{GitRunInfo, Repo, RepoVcs};
use lib::try_exit_code;
use lib::util::EyreExitOr;
use tracing::instrument;

use super::{finish, handle_result};

/// Fast-forward the current branch to its upstream. Diverged branches are left
/// untouched.
#[instrument(skip(effects, git_run_info))]
pub fn sync(
    effects: &Effects,
    git_run_info: &GitRunInfo,
    fetch: Option<bool>,
    stash: Option<bool>,
) -> EyreExitOr<()> {
    let repo = Repo::from_current_dir()?;
    let policy = SyncPolicy {
        prefer_rebase: get_prefer_rebase(&repo)?,
        do_fetch: fetch.map_or_else(|| get_fetch_first(&repo), Ok)?,
        do_stash: stash.map_or_else(|| get_auto_stash(&repo), Ok)?,
        fast_forward_only: true,
        ..Default::default()
    };

    let vcs = RepoVcs::new(effects, &repo, git_run_info);
    let outcome = try_exit_code!(handle_result(
        effects,
        execute_sync(&vcs, effects, &policy)
    )?);
    finish(outcome.exit_code())
}
