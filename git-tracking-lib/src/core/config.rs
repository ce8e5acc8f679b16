//! Accesses repo-specific configuration.

use std::fmt::Write;

use cursive_core::theme::{BaseColor, Effect, Style};
use cursive_core::utils::markup::StyledString;
use tracing::instrument;

use crate::core::effects::Effects;
use crate::core::formatting::StyledStringBuilder;
use crate::git::Repo;

/// Config key for [`get_prefer_rebase`].
pub const PREFER_REBASE_CONFIG_KEY: &str = "tracking.preferRebase";

/// Config key for [`get_fetch_first`].
pub const FETCH_FIRST_CONFIG_KEY: &str = "tracking.fetchFirst";

/// Config key for [`get_auto_stash`].
pub const AUTO_STASH_CONFIG_KEY: &str = "tracking.autoStash";

/// Config key for [`get_remote_only`].
pub const REMOTE_ONLY_CONFIG_KEY: &str = "tracking.remoteOnly";

/// If `true`, diverged branches without local merge commits are rebased onto
/// their upstream instead of merged.
#[instrument]
pub fn get_prefer_rebase(repo: &Repo) -> eyre::Result<bool> {
    Ok(repo
        .get_readonly_config()?
        .get_or(PREFER_REBASE_CONFIG_KEY, true)?)
}

/// If `true`, fetch before syncing or reporting.
#[instrument]
pub fn get_fetch_first(repo: &Repo) -> eyre::Result<bool> {
    Ok(repo
        .get_readonly_config()?
        .get_or(FETCH_FIRST_CONFIG_KEY, false)?)
}

/// If `true`, stash uncommitted changes around operations which move branches.
#[instrument]
pub fn get_auto_stash(repo: &Repo) -> eyre::Result<bool> {
    Ok(repo
        .get_readonly_config()?
        .get_or(AUTO_STASH_CONFIG_KEY, false)?)
}

/// If `true`, the status report only lists branches which track something.
#[instrument]
pub fn get_remote_only(repo: &Repo) -> eyre::Result<bool> {
    Ok(repo
        .get_readonly_config()?
        .get_or(REMOTE_ONLY_CONFIG_KEY, false)?)
}

/// Render the leading colored "hint" text for use in messaging.
pub fn get_hint_string() -> StyledString {
    StyledStringBuilder::new()
        .append_styled(
            "hint",
            Style::merge(&[BaseColor::Blue.dark().into(), Effect::Bold.into()]),
        )
        .build()
}

/// Print a hint suggesting how the user might proceed.
pub fn print_hint(effects: &Effects, hint: &str) -> eyre::Result<()> {
    writeln!(
        effects.get_error_stream(),
        "{}: {}",
        effects.get_glyphs().render(get_hint_string())?,
        hint,
    )?;
    Ok(())
}

/// Environment variables which affect the functioning of `git-tracking`.
pub mod env_vars {
    use std::path::PathBuf;
    use std::process::Command;

    use eyre::Context;
    use tracing::instrument;

    use crate::util::get_from_path;

    /// Path to the Git executable to shell out to as a subprocess when
    /// appropriate. This may be set during tests.
    pub const TEST_GIT: &str = "TEST_GIT";

    /// "Path to wherever your core Git programs are installed". You can find
    /// the default value by running `git --exec-path`.
    ///
    /// See <https://git-scm.com/docs/git#Documentation/git.txt---exec-pathltpathgt>.
    pub const TEST_GIT_EXEC_PATH: &str = "TEST_GIT_EXEC_PATH";

    /// Get the path to the Git executable for testing. Falls back to the `git`
    /// found on `PATH`.
    #[instrument]
    pub fn get_path_to_git() -> eyre::Result<PathBuf> {
        if let Some(path_to_git) = std::env::var_os(TEST_GIT) {
            return Ok(PathBuf::from(path_to_git));
        }
        get_from_path("git").ok_or_else(|| {
            eyre::eyre!(
                "No path to Git executable was set and `git` is not on PATH. \
Try running as: `{0}=$(which git) cargo test ...`",
                TEST_GIT,
            )
        })
    }

    /// Get the `GIT_EXEC_PATH` environment variable for testing. Falls back
    /// to asking `git --exec-path`.
    #[instrument]
    pub fn get_git_exec_path() -> eyre::Result<PathBuf> {
        if let Some(git_exec_path) = std::env::var_os(TEST_GIT_EXEC_PATH) {
            return Ok(PathBuf::from(git_exec_path));
        }
        let output = Command::new(get_path_to_git()?)
            .arg("--exec-path")
            .output()
            .wrap_err("Running `git --exec-path`")?;
        if !output.status.success() {
            eyre::bail!(
                "`git --exec-path` failed; set `{}` explicitly",
                TEST_GIT_EXEC_PATH
            );
        }
        let git_exec_path =
            String::from_utf8(output.stdout).wrap_err("Decoding `git --exec-path` output")?;
        Ok(PathBuf::from(git_exec_path.trim_end()))
    }
}
