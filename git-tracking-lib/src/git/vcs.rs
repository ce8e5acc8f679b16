//! The narrow set of queries and mutations that tracking logic needs from
//! Git.
//!
//! [`Vcs`] is the only way the core modules talk to a repository. The real
//! implementation, [`RepoVcs`], answers queries through `git2` and performs
//! working-copy mutations by running `git` so that hooks and the user's Git
//! configuration apply. Every method distinguishes "absent" (`Ok(None)`,
//! `Ok(false)`) from failure.

use std::ffi::OsString;

use tracing::{instrument, warn};

use crate::core::effects::Effects;
use crate::core::error::{Error, Result};
use crate::git::oid::NonZeroOid;
use crate::git::reference::ReferenceName;
use crate::git::repo::{Error as RepoError, Repo};
use crate::git::run::GitRunInfo;
use crate::util::ExitCode;

/// The result of a merge-family update of the checked-out branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The branch was moved (or was already up to date).
    Updated,

    /// A fast-forward-only update was requested, but the target is not a
    /// descendant of the current branch. Nothing was changed.
    NotFastForward,

    /// The merge or rebase stopped with conflicts. The repository is left in
    /// the middle of the operation for the user to resolve.
    Conflict,
}

/// The result of saving uncommitted changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StashOutcome {
    /// A stash entry was created and must be restored later.
    Saved,

    /// There were no changes to tracked files, so no stash entry exists.
    NothingToStash,
}

/// The configuration key storing the remote that `branch_name` tracks.
pub fn branch_remote_key(branch_name: &str) -> String {
    format!("branch.{branch_name}.remote")
}

/// The configuration key storing the remote branch that `branch_name` tracks.
pub fn branch_merge_key(branch_name: &str) -> String {
    format!("branch.{branch_name}.merge")
}

/// Queries and mutations against a repository.
pub trait Vcs {
    /// The short name of the checked-out branch, or `None` if `HEAD` is
    /// detached.
    fn current_branch(&self) -> Result<Option<String>>;

    /// Read a string configuration value. An unset key is `Ok(None)`.
    fn get_config(&self, key: &str) -> Result<Option<String>>;

    /// Write a string configuration value to the repository configuration.
    fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a configuration value. Removing an unset key succeeds.
    fn unset_config(&self, key: &str) -> Result<()>;

    /// Whether the given reference exists.
    fn ref_exists(&self, reference: &ReferenceName) -> Result<bool>;

    /// The commit the given reference points to, if it exists.
    fn ref_target(&self, reference: &ReferenceName) -> Result<Option<NonZeroOid>>;

    /// Short names of every local branch, sorted.
    fn local_branch_names(&self) -> Result<Vec<String>>;

    /// Names of every configured remote, sorted.
    fn remote_names(&self) -> Result<Vec<String>>;

    /// Number of commits reachable from `from` but not from `excluding`.
    fn commits_only_in(&self, from: &ReferenceName, excluding: &ReferenceName) -> Result<usize>;

    /// Whether any commit reachable from `from` but not from `excluding` has
    /// more than one parent.
    fn has_multi_parent_commit(
        &self,
        from: &ReferenceName,
        excluding: &ReferenceName,
    ) -> Result<bool>;

    /// Fetch from `remote`, optionally restricted to `refspec`.
    fn fetch(&self, remote: &str, refspec: Option<&str>) -> Result<()>;

    /// Ask `remote` itself (not the local remote-tracking refs) whether it
    /// has a branch named `branch_name`.
    fn remote_has_branch(&self, remote: &str, branch_name: &str) -> Result<bool>;

    /// Move the checked-out branch to `target` if that is a fast-forward.
    fn merge_fast_forward_only(&self, target: &ReferenceName) -> Result<UpdateOutcome>;

    /// Merge `target` into the checked-out branch.
    fn merge(&self, target: &ReferenceName) -> Result<UpdateOutcome>;

    /// Rebase the checked-out branch onto `target`.
    fn rebase(&self, target: &ReferenceName) -> Result<UpdateOutcome>;

    /// Create a local branch without any tracking configuration.
    fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<()>;

    /// Delete a local branch. With `force`, unmerged branches are deleted too.
    fn delete_branch(&self, name: &str, force: bool) -> Result<()>;

    /// Check out a local branch.
    fn checkout(&self, name: &str) -> Result<()>;

    /// Detach `HEAD` at `target`, keeping the working copy.
    fn checkout_detached(&self, target: &str) -> Result<()>;

    /// Add an empty commit to `branch_name` without touching the working copy.
    fn create_marker_commit(&self, branch_name: &str, message: &str) -> Result<NonZeroOid>;

    /// Save uncommitted changes to tracked files.
    fn stash_save(&self, label: &str) -> Result<StashOutcome>;

    /// Restore the most recently saved changes.
    fn stash_pop(&self) -> Result<()>;

    /// Record that `branch_name` tracks `merge_reference` on `remote_name`.
    ///
    /// Both halves are written or neither is: if writing the second key fails,
    /// the first is restored to its previous value.
    fn set_tracking(
        &self,
        branch_name: &str,
        remote_name: &str,
        merge_reference: &ReferenceName,
    ) -> Result<()> {
        let remote_key = branch_remote_key(branch_name);
        let merge_key = branch_merge_key(branch_name);
        let previous_remote = self.get_config(&remote_key)?;

        self.set_config(&remote_key, remote_name)?;
        if let Err(err) = self.set_config(&merge_key, merge_reference.as_str()) {
            let rollback_result = match &previous_remote {
                Some(previous_remote) => self.set_config(&remote_key, previous_remote),
                None => self.unset_config(&remote_key),
            };
            if let Err(rollback_err) = rollback_result {
                warn!(
                    ?rollback_err,
                    ?remote_key,
                    "Could not restore tracking remote after failed write"
                );
            }
            return Err(err);
        }
        Ok(())
    }
}

/// [`Vcs`] backed by a real repository.
pub struct RepoVcs<'a> {
    effects: &'a Effects,
    repo: &'a Repo,
    git_run_info: &'a GitRunInfo,
}

impl std::fmt::Debug for RepoVcs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<RepoVcs repo={:?}>", self.repo)
    }
}

impl<'a> RepoVcs<'a> {
    /// Constructor. Output from Git subprocesses goes to `effects`.
    pub fn new(effects: &'a Effects, repo: &'a Repo, git_run_info: &'a GitRunInfo) -> Self {
        Self {
            effects,
            repo,
            git_run_info,
        }
    }

    fn run_git(&self, args: &[&str]) -> Result<std::result::Result<(), ExitCode>> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        self.git_run_info
            .run(self.effects, &args)
            .map_err(Error::RunGit)
    }

    fn run_git_or_fail(&self, args: &[&str]) -> Result<()> {
        match self.run_git(args)? {
            Ok(()) => Ok(()),
            Err(exit_code) => Err(subprocess_failed(args, exit_code)),
        }
    }

    fn require_target(&self, reference: &ReferenceName) -> Result<NonZeroOid> {
        self.repo.find_reference_oid(reference)?.ok_or_else(|| {
            Error::Repo(RepoError::Other(format!(
                "reference {reference} does not exist"
            )))
        })
    }

    /// Run a merge-family command, telling conflicts apart from other
    /// failures by whether Git left an operation in progress.
    fn run_update(&self, args: &[&str], operation_type: &str) -> Result<UpdateOutcome> {
        match self.run_git(args)? {
            Ok(()) => Ok(UpdateOutcome::Updated),
            Err(_) if self.repo.get_current_operation_type() == Some(operation_type) => {
                Ok(UpdateOutcome::Conflict)
            }
            Err(exit_code) => Err(subprocess_failed(args, exit_code)),
        }
    }
}

fn subprocess_failed(args: &[&str], exit_code: ExitCode) -> Error {
    Error::SubprocessFailed {
        command: format!("git {}", args.join(" ")),
        exit_code,
    }
}

impl Vcs for RepoVcs<'_> {
    #[instrument]
    fn current_branch(&self) -> Result<Option<String>> {
        let head_info = self.repo.get_head_info()?;
        Ok(head_info.get_branch_name().map(ToOwned::to_owned))
    }

    #[instrument]
    fn get_config(&self, key: &str) -> Result<Option<String>> {
        let config = self.repo.get_readonly_config()?;
        match config.get::<String, _>(key) {
            Ok(value) => Ok(value.filter(|value| !value.is_empty())),
            Err(RepoError::ReadConfigKey { source, key }) => Err(Error::ConfigQueryFailed {
                key,
                message: source.message().to_owned(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument]
    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.repo.get_config()?;
        config.set(key, value)?;
        Ok(())
    }

    #[instrument]
    fn unset_config(&self, key: &str) -> Result<()> {
        let mut config = self.repo.get_config()?;
        config.remove(key)?;
        Ok(())
    }

    #[instrument]
    fn ref_exists(&self, reference: &ReferenceName) -> Result<bool> {
        Ok(self.repo.reference_exists(reference)?)
    }

    #[instrument]
    fn ref_target(&self, reference: &ReferenceName) -> Result<Option<NonZeroOid>> {
        Ok(self.repo.find_reference_oid(reference)?)
    }

    #[instrument]
    fn local_branch_names(&self) -> Result<Vec<String>> {
        Ok(self.repo.get_all_local_branch_names()?)
    }

    #[instrument]
    fn remote_names(&self) -> Result<Vec<String>> {
        Ok(self.repo.get_all_remote_names()?)
    }

    #[instrument]
    fn commits_only_in(&self, from: &ReferenceName, excluding: &ReferenceName) -> Result<usize> {
        let from = self.require_target(from)?;
        let excluding = self.require_target(excluding)?;
        Ok(self.repo.count_commits_only_in(from, excluding)?)
    }

    #[instrument]
    fn has_multi_parent_commit(
        &self,
        from: &ReferenceName,
        excluding: &ReferenceName,
    ) -> Result<bool> {
        let from = self.require_target(from)?;
        let excluding = self.require_target(excluding)?;
        Ok(self.repo.range_has_merge_commit(from, excluding)?)
    }

    #[instrument]
    fn fetch(&self, remote: &str, refspec: Option<&str>) -> Result<()> {
        let mut args = vec!["fetch", remote];
        args.extend(refspec);
        self.run_git_or_fail(&args)
    }

    #[instrument]
    fn remote_has_branch(&self, remote: &str, branch_name: &str) -> Result<bool> {
        let pattern = ReferenceName::local_branch(branch_name);
        let args = ["ls-remote", "--exit-code", "--heads", remote, pattern.as_str()];
        let result = self
            .git_run_info
            .run_quietly(self.repo, &args)
            .map_err(Error::RunGit)?;
        // `--exit-code` exits with 2 when nothing matched.
        match result.exit_code {
            ExitCode(0) => Ok(true),
            ExitCode(2) => Ok(false),
            exit_code => Err(subprocess_failed(&args, exit_code)),
        }
    }

    #[instrument]
    fn merge_fast_forward_only(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
        let target_oid = self.require_target(target)?;
        if let Some(head_oid) = self.repo.get_head_info()?.oid {
            if !self.repo.is_descendant_of(target_oid, head_oid)? {
                return Ok(UpdateOutcome::NotFastForward);
            }
        }
        self.run_git_or_fail(&["merge", "--ff-only", target.as_str()])?;
        Ok(UpdateOutcome::Updated)
    }

    #[instrument]
    fn merge(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
        self.run_update(&["merge", "--no-edit", target.as_str()], "merge")
    }

    #[instrument]
    fn rebase(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
        self.run_update(&["rebase", target.as_str()], "rebase")
    }

    #[instrument]
    fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<()> {
        let mut args = vec!["branch", "--no-track", name];
        args.extend(start_point);
        self.run_git_or_fail(&args)
    }

    #[instrument]
    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run_git_or_fail(&["branch", flag, name])
    }

    #[instrument]
    fn checkout(&self, name: &str) -> Result<()> {
        self.run_git_or_fail(&["checkout", name])
    }

    #[instrument]
    fn checkout_detached(&self, target: &str) -> Result<()> {
        let args = ["checkout", "--quiet", "--detach", target];
        let result = self
            .git_run_info
            .run_quietly(self.repo, &args)
            .map_err(Error::RunGit)?;
        if result.exit_code.is_success() {
            Ok(())
        } else {
            Err(subprocess_failed(&args, result.exit_code))
        }
    }

    #[instrument]
    fn create_marker_commit(&self, branch_name: &str, message: &str) -> Result<NonZeroOid> {
        let reference = ReferenceName::local_branch(branch_name);
        Ok(self.repo.create_marker_commit(&reference, message)?)
    }

    #[instrument]
    fn stash_save(&self, label: &str) -> Result<StashOutcome> {
        if !self.repo.has_uncommitted_changes()? {
            return Ok(StashOutcome::NothingToStash);
        }
        self.run_git_or_fail(&["stash", "push", "--message", label])?;
        Ok(StashOutcome::Saved)
    }

    #[instrument]
    fn stash_pop(&self) -> Result<()> {
        self.run_git_or_fail(&["stash", "pop"])
    }
}
