//! Tools for interfacing with the Git repository.

mod config;
mod oid;
mod reference;
mod repo;
mod run;
mod vcs;

pub use config::{Config, ConfigValue, GetConfigValue};
pub use oid::NonZeroOid;
pub use reference::{ReferenceName, ReferenceNameError, LOCAL_REMOTE_NAME};
pub use repo::{Error as RepoError, Repo, ResolvedReferenceInfo, Result as RepoResult};
pub use run::{GitOutput, GitRunInfo};
pub use vcs::{branch_merge_key, branch_remote_key, RepoVcs, StashOutcome, UpdateOutcome, Vcs};
