//! Operations on the Git repository. This module exists for a few reasons:
//!
//! - To ensure that every call to a Git operation has an associated error
//!   variant describing what was being attempted.
//! - To improve the interface in some cases. In particular, some operations in
//!   `git2` return an `Error` with code `ENOTFOUND`, but we should really return
//!   an `Option` in those cases.
//! - To make it possible to audit all the `git2` calls carried out in the
//!   codebase.

use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use thiserror::Error;
use tracing::instrument;

use crate::git::config::Config;
use crate::git::oid::{make_non_zero_oid, NonZeroOid};
use crate::git::reference::{ReferenceName, ReferenceNameError};

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open repository: {0}")]
    OpenRepo(#[source] git2::Error),

    #[error("could not read config: {0}")]
    ReadConfig(#[source] git2::Error),

    #[error("could not read config key '{key}': {source}")]
    ReadConfigKey {
        source: git2::Error,
        key: String,
    },

    #[error("could not set config key '{key}' to '{value}': {source}")]
    WriteConfigKey {
        source: git2::Error,
        key: String,
        value: String,
    },

    #[error("could not remove config key '{key}': {source}")]
    RemoveConfigKey {
        source: git2::Error,
        key: String,
    },

    #[error("could not find reference '{}': {source}", name.as_str())]
    FindReference {
        source: git2::Error,
        name: ReferenceName,
    },

    #[error("could not get branches: {0}")]
    GetBranches(#[source] git2::Error),

    #[error("could not read branch information: {0}")]
    ReadBranch(#[source] git2::Error),

    #[error("could not get remote names: {0}")]
    GetRemoteNames(#[source] git2::Error),

    #[error("could not walk commits from {from} excluding {excluding}: {source}")]
    WalkCommits {
        source: git2::Error,
        from: NonZeroOid,
        excluding: NonZeroOid,
    },

    #[error("could not determine whether {descendant} descends from {ancestor}: {source}")]
    CheckAncestry {
        source: git2::Error,
        descendant: NonZeroOid,
        ancestor: NonZeroOid,
    },

    #[error("could not find commit {oid}: {source}")]
    FindCommit { source: git2::Error, oid: NonZeroOid },

    #[error("could not create commit: {0}")]
    CreateCommit(#[source] git2::Error),

    #[error("could not create commit signature: {0}")]
    CreateSignature(#[source] git2::Error),

    #[error("could not read working copy status: {0}")]
    ReadStatus(#[source] git2::Error),

    #[error("could not decode UTF-8 value for {item}")]
    DecodeUtf8 { item: &'static str },

    #[error("could not decode UTF-8 value for reference name: {0}")]
    DecodeReferenceName(#[from] ReferenceNameError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("miscellaneous error: {0}")]
    Other(String),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A snapshot of information about `HEAD`. Updates to `HEAD` after this value
/// is obtained are not reflected.
///
/// - If `HEAD` is detached, it points directly to a commit and
///   `reference_name` is `None`.
/// - If `HEAD` is unborn (a freshly-initialized repository), `oid` is `None`
///   but `reference_name` is still set.
#[derive(Debug, PartialEq, Eq)]
pub struct ResolvedReferenceInfo {
    /// The OID of the commit that `HEAD` points to. If `HEAD` is unborn, then
    /// this is `None`.
    pub oid: Option<NonZeroOid>,

    /// The name of the reference that `HEAD` points to symbolically. If `HEAD`
    /// is detached, then this is `None`.
    pub reference_name: Option<ReferenceName>,
}

impl ResolvedReferenceInfo {
    /// Get the name of the branch, if any. Returns `None` if `HEAD` is
    /// detached. The `refs/heads/` prefix, if any, is stripped.
    pub fn get_branch_name(&self) -> Option<&str> {
        let reference_name = self.reference_name.as_ref()?.as_str();
        Some(
            reference_name
                .strip_prefix("refs/heads/")
                .unwrap_or(reference_name),
        )
    }
}

/// Wrapper around `git2::Repository`.
pub struct Repo {
    pub(super) inner: git2::Repository,
}

impl std::fmt::Debug for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Git repository at: {:?}>", self.get_path())
    }
}

impl Repo {
    /// Get the Git repository associated with the given directory.
    #[instrument]
    pub fn from_dir(path: &Path) -> Result<Self> {
        let repo = git2::Repository::discover(path).map_err(Error::OpenRepo)?;
        Ok(Repo { inner: repo })
    }

    /// Get the Git repository associated with the current directory.
    #[instrument]
    pub fn from_current_dir() -> Result<Self> {
        let path = std::env::current_dir().map_err(Error::Io)?;
        Repo::from_dir(&path)
    }

    /// Get the path to the `.git` directory for the repository.
    pub fn get_path(&self) -> &Path {
        self.inner.path()
    }

    /// Get the path to the working copy for this repository. If the repository
    /// is bare (has no working copy), returns `None`.
    pub fn get_working_copy_path(&self) -> Option<PathBuf> {
        self.inner.workdir().map(Path::to_path_buf)
    }

    /// Get the repository-local configuration file (`.git/config`). Use this
    /// for writes; reads through it do not see global or system values.
    #[instrument]
    pub fn get_config(&self) -> Result<Config> {
        let config = self.inner.config().map_err(Error::ReadConfig)?;
        let config = config
            .open_level(git2::ConfigLevel::Local)
            .or_else(|_| self.inner.config())
            .map_err(Error::ReadConfig)?;
        Ok(Config::from(config))
    }

    /// Get a read-only view of the merged configuration for the repository.
    #[instrument]
    pub fn get_readonly_config(&self) -> Result<Config> {
        let config = self.inner.config().map_err(Error::ReadConfig)?;
        Ok(Config::from(config))
    }

    /// Get a snapshot of information about `HEAD`.
    #[instrument]
    pub fn get_head_info(&self) -> Result<ResolvedReferenceInfo> {
        let head = match self.inner.find_reference("HEAD") {
            Ok(head) => head,
            Err(err) if err.code() == git2::ErrorCode::NotFound => {
                return Ok(ResolvedReferenceInfo {
                    oid: None,
                    reference_name: None,
                })
            }
            Err(err) => {
                return Err(Error::FindReference {
                    source: err,
                    name: "HEAD".into(),
                })
            }
        };

        let reference_name = match head.kind() {
            Some(git2::ReferenceType::Direct) => None,
            Some(git2::ReferenceType::Symbolic) => match head.symbolic_target_bytes() {
                Some(name) => Some(ReferenceName::from_bytes(name.to_vec())?),
                None => return Err(Error::DecodeUtf8 { item: "HEAD" }),
            },
            None => return Err(Error::Other("Unknown `HEAD` reference type".to_string())),
        };
        let oid = match head.resolve() {
            Ok(resolved) => resolved.target().and_then(make_non_zero_oid),
            Err(err) if err.code() == git2::ErrorCode::NotFound => None,
            Err(err) => {
                return Err(Error::FindReference {
                    source: err,
                    name: "HEAD".into(),
                })
            }
        };
        Ok(ResolvedReferenceInfo {
            oid,
            reference_name,
        })
    }

    /// Get the commit that the given reference points to, or `None` if the
    /// reference does not exist.
    #[instrument]
    pub fn find_reference_oid(&self, name: &ReferenceName) -> Result<Option<NonZeroOid>> {
        match self.inner.refname_to_id(name.as_str()) {
            Ok(oid) => Ok(make_non_zero_oid(oid)),
            Err(err)
                if err.code() == git2::ErrorCode::NotFound
                    || err.code() == git2::ErrorCode::InvalidSpec =>
            {
                Ok(None)
            }
            Err(source) => Err(Error::FindReference {
                source,
                name: name.clone(),
            }),
        }
    }

    /// Whether the given reference exists in the local reference database.
    pub fn reference_exists(&self, name: &ReferenceName) -> Result<bool> {
        Ok(self.find_reference_oid(name)?.is_some())
    }

    /// Get the short names of all local branches, sorted.
    #[instrument]
    pub fn get_all_local_branch_names(&self) -> Result<Vec<String>> {
        let branches = self
            .inner
            .branches(Some(git2::BranchType::Local))
            .map_err(Error::GetBranches)?;
        let mut names = Vec::new();
        for branch in branches {
            let (branch, _branch_type) = branch.map_err(Error::ReadBranch)?;
            let name = branch
                .name_bytes()
                .map_err(Error::ReadBranch)?
                .to_vec();
            let name =
                String::from_utf8(name).map_err(|_| Error::DecodeUtf8 { item: "branch name" })?;
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Get the names of all configured remotes.
    #[instrument]
    pub fn get_all_remote_names(&self) -> Result<Vec<String>> {
        let remotes = self.inner.remotes().map_err(Error::GetRemoteNames)?;
        Ok(remotes
            .iter()
            .enumerate()
            .filter_map(|(i, remote_name)| match remote_name {
                Some(remote_name) => Some(remote_name.to_owned()),
                None => {
                    tracing::warn!(remote_index = i, "Remote name could not be decoded");
                    None
                }
            })
            .sorted()
            .collect())
    }

    fn walk_only_in(&self, from: NonZeroOid, excluding: NonZeroOid) -> Result<git2::Revwalk<'_>> {
        let wrap = |source| Error::WalkCommits {
            source,
            from,
            excluding,
        };
        let mut walk = self.inner.revwalk().map_err(wrap)?;
        walk.push(from.inner).map_err(wrap)?;
        walk.hide(excluding.inner).map_err(wrap)?;
        Ok(walk)
    }

    /// Count the commits reachable from `from` but not from `excluding`.
    #[instrument]
    pub fn count_commits_only_in(&self, from: NonZeroOid, excluding: NonZeroOid) -> Result<usize> {
        let mut count = 0;
        for oid in self.walk_only_in(from, excluding)? {
            oid.map_err(|source| Error::WalkCommits {
                source,
                from,
                excluding,
            })?;
            count += 1;
        }
        Ok(count)
    }

    /// Whether any commit reachable from `from` but not from `excluding` has
    /// more than one parent.
    #[instrument]
    pub fn range_has_merge_commit(&self, from: NonZeroOid, excluding: NonZeroOid) -> Result<bool> {
        for oid in self.walk_only_in(from, excluding)? {
            let oid = oid.map_err(|source| Error::WalkCommits {
                source,
                from,
                excluding,
            })?;
            let commit = self.inner.find_commit(oid).map_err(|source| Error::FindCommit {
                source,
                oid: NonZeroOid { inner: oid },
            })?;
            if commit.parent_count() > 1 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether `descendant` is `ancestor` or one of its descendants, i.e.
    /// whether moving a ref from `ancestor` to `descendant` is a fast-forward.
    #[instrument]
    pub fn is_descendant_of(&self, descendant: NonZeroOid, ancestor: NonZeroOid) -> Result<bool> {
        if descendant == ancestor {
            return Ok(true);
        }
        self.inner
            .graph_descendant_of(descendant.inner, ancestor.inner)
            .map_err(|source| Error::CheckAncestry {
                source,
                descendant,
                ancestor,
            })
    }

    /// Get the type current multi-step operation (such as `rebase` or
    /// `merge`) which is underway. Returns `None` if there is no such
    /// operation.
    pub fn get_current_operation_type(&self) -> Option<&str> {
        use git2::RepositoryState::*;
        match self.inner.state() {
            Clean | Bisect => None,
            Merge => Some("merge"),
            Revert | RevertSequence => Some("revert"),
            CherryPick | CherryPickSequence => Some("cherry-pick"),
            Rebase | RebaseInteractive | RebaseMerge => Some("rebase"),
            ApplyMailbox | ApplyMailboxOrRebase => Some("am"),
        }
    }

    /// Whether tracked files in the index or working copy differ from `HEAD`.
    /// Untracked files are not considered, matching what `git stash` saves by
    /// default.
    #[instrument]
    pub fn has_uncommitted_changes(&self) -> Result<bool> {
        let mut options = git2::StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self
            .inner
            .statuses(Some(&mut options))
            .map_err(Error::ReadStatus)?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status() != git2::Status::CURRENT))
    }

    /// Create an empty commit on top of the commit that `branch_reference`
    /// points to and advance the reference to it. Does not touch the index or
    /// working copy.
    #[instrument]
    pub fn create_marker_commit(
        &self,
        branch_reference: &ReferenceName,
        message: &str,
    ) -> Result<NonZeroOid> {
        let parent_oid = self
            .find_reference_oid(branch_reference)?
            .ok_or_else(|| {
                Error::Other(format!(
                    "cannot create marker commit: {} does not exist",
                    branch_reference
                ))
            })?;
        let parent = self
            .inner
            .find_commit(parent_oid.inner)
            .map_err(|source| Error::FindCommit {
                source,
                oid: parent_oid,
            })?;
        let tree = parent.tree().map_err(|source| Error::FindCommit {
            source,
            oid: parent_oid,
        })?;
        let signature = self.inner.signature().map_err(Error::CreateSignature)?;
        let oid = self
            .inner
            .commit(
                Some(branch_reference.as_str()),
                &signature,
                &signature,
                message,
                &tree,
                &[&parent],
            )
            .map_err(Error::CreateCommit)?;
        make_non_zero_oid(oid).ok_or_else(|| Error::Other("created commit has zero OID".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_branch_name_strips_prefix() {
        let info = ResolvedReferenceInfo {
            oid: None,
            reference_name: Some("refs/heads/feature".into()),
        };
        assert_eq!(info.get_branch_name(), Some("feature"));

        let detached = ResolvedReferenceInfo {
            oid: None,
            reference_name: None,
        };
        assert_eq!(detached.get_branch_name(), None);
    }
}
