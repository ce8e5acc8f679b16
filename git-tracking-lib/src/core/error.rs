//! Errors produced while resolving, analyzing, syncing, or provisioning
//! tracking relationships.

use std::io;

use thiserror::Error;

use crate::git::RepoError;
use crate::util::ExitCode;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error {
    #[error("HEAD is not on a branch")]
    NotOnABranch,

    #[error("branch '{branch_name}' does not track a remote branch")]
    Untracked { branch_name: String },

    #[error("could not read config key '{key}': {message}")]
    ConfigQueryFailed { key: String, message: String },

    #[error("remote '{remote_name}' is not configured (no remote.{remote_name}.url)")]
    RemoteUnknown { remote_name: String },

    #[error("remote branch '{reference_name}' does not exist")]
    RemoteRefMissing { reference_name: String },

    #[error(
        "branch '{branch_name}' already tracks '{existing_remote}/{existing_branch}', \
         not '{requested_remote}/{requested_branch}'"
    )]
    TrackingConflict {
        branch_name: String,
        existing_remote: String,
        existing_branch: String,
        requested_remote: String,
        requested_branch: String,
    },

    #[error(
        "replacing branch '{branch_name}' with '{remote_reference_name}' would lose {num_commits} \
         commit(s) which only exist locally"
    )]
    WouldLoseCommits {
        branch_name: String,
        remote_reference_name: String,
        num_commits: usize,
    },

    #[error("branch '{branch_name}' has diverged (ahead {ahead_count}, behind {behind_count})")]
    Diverged {
        branch_name: String,
        ahead_count: usize,
        behind_count: usize,
    },

    #[error("`{command}` failed with exit code {}", exit_code.0)]
    SubprocessFailed { command: String, exit_code: ExitCode },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("could not run git: {0:#}")]
    RunGit(eyre::Report),

    #[error("could not write output: {0}")]
    Output(#[from] std::fmt::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The exit code to terminate the process with when this error ends a
    /// command. Subprocess failures propagate the underlying exit code
    /// unchanged.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::SubprocessFailed {
                command: _,
                exit_code,
            } => *exit_code,
            Error::NotOnABranch
            | Error::Untracked { .. }
            | Error::ConfigQueryFailed { .. }
            | Error::RemoteUnknown { .. }
            | Error::RemoteRefMissing { .. }
            | Error::TrackingConflict { .. }
            | Error::WouldLoseCommits { .. }
            | Error::Diverged { .. }
            | Error::Repo(_)
            | Error::RunGit(_)
            | Error::Output(_)
            | Error::Io(_) => ExitCode(1),
        }
    }

    /// A suggestion for the user on how to resolve this error, if there is an
    /// obvious one.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::NotOnABranch => Some("check out a branch first: git checkout <branch>".into()),
            Error::Untracked { branch_name } => Some(format!(
                "set up tracking with: git tracking track <remote> {branch_name}"
            )),
            Error::RemoteUnknown { remote_name } => Some(format!(
                "add the remote first: git remote add {remote_name} <url>"
            )),
            Error::RemoteRefMissing { reference_name: _ } => Some(
                "fetch the remote with --fetch, or push the branch if it only exists locally"
                    .into(),
            ),
            Error::TrackingConflict { branch_name, .. } => Some(format!(
                "remove the existing relationship first: git branch --unset-upstream {branch_name}"
            )),
            Error::WouldLoseCommits { branch_name, .. } => Some(format!(
                "push or move the local commits on '{branch_name}' first"
            )),
            Error::Diverged { .. } => {
                Some("use `git tracking pull` to rebase or merge instead".into())
            }
            Error::ConfigQueryFailed { .. }
            | Error::SubprocessFailed { .. }
            | Error::Repo(_)
            | Error::RunGit(_)
            | Error::Output(_)
            | Error::Io(_) => None,
        }
    }
}
