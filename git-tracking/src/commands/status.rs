//! Implements the `git tracking status` command.

use std::fmt::Write;

use lib::core::config::{get_auto_stash, get_fetch_first, get_remote_only};
use lib::core::decision::SyncPolicy;
use lib::core::effects::Effects;
use lib::core::report::{render_report, report_branches};
use lib::git::{GitRunInfo, Repo, RepoVcs};
use lib::try_exit_code;
use lib::util::EyreExitOr;
use tracing::instrument;

use super::handle_result;

/// Print one line per local branch describing how it relates to its upstream,
/// optionally fast-forwarding branches which are behind.
#[instrument(skip(effects, git_run_info))]
pub fn status(
    effects: &Effects,
    git_run_info: &GitRunInfo,
    fetch: Option<bool>,
    pull: bool,
    stash: Option<bool>,
    remote_only: Option<bool>,
) -> EyreExitOr<()> {
    let repo = Repo::from_current_dir()?;
    let policy = SyncPolicy {
        remote_only: remote_only.map_or_else(|| get_remote_only(&repo), Ok)?,
        do_fetch: fetch.map_or_else(|| get_fetch_first(&repo), Ok)?,
        do_pull: pull,
        // Stashing only matters when branches are checked out to be pulled.
        do_stash: pull && stash.map_or_else(|| get_auto_stash(&repo), Ok)?,
        fast_forward_only: true,
        ..Default::default()
    };

    let vcs = RepoVcs::new(effects, &repo, git_run_info);
    let reports = try_exit_code!(handle_result(
        effects,
        report_branches(&vcs, effects, &policy)
    )?);

    let glyphs = effects.get_glyphs();
    for line in render_report(glyphs, &reports) {
        writeln!(effects.get_output_stream(), "{}", glyphs.render(line)?)?;
    }
    Ok(Ok(()))
}
