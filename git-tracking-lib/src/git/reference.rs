use std::string::FromUtf8Error;

use thiserror::Error;

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ReferenceNameError {
    #[error("reference name was not valid UTF-8: {0}")]
    InvalidUtf8(FromUtf8Error),
}

/// The remote name Git uses in `branch.<name>.remote` when a branch tracks
/// another branch in the same repository.
pub const LOCAL_REMOTE_NAME: &str = ".";

/// The name of a reference, like `refs/heads/master`.
#[derive(Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct ReferenceName(String);

impl ReferenceName {
    /// Create a reference name from the provided bytestring. Non-UTF-8 references are not supported.
    pub fn from_bytes(bytes: Vec<u8>) -> std::result::Result<ReferenceName, ReferenceNameError> {
        let reference_name = String::from_utf8(bytes).map_err(ReferenceNameError::InvalidUtf8)?;
        Ok(Self(reference_name))
    }

    /// The reference for the local branch with the given short name.
    pub fn local_branch(branch_name: &str) -> Self {
        Self(format!("refs/heads/{branch_name}"))
    }

    /// The remote-tracking reference which records where `branch_name` was
    /// on `remote_name` as of the last fetch. For the `.` pseudo-remote, this
    /// is the local branch itself.
    pub fn remote_tracking(remote_name: &str, branch_name: &str) -> Self {
        if remote_name == LOCAL_REMOTE_NAME {
            Self::local_branch(branch_name)
        } else {
            Self(format!("refs/remotes/{remote_name}/{branch_name}"))
        }
    }

    /// View this reference name as a string. (This is a zero-cost conversion.)
    pub fn as_str(&self) -> &str {
        let Self(reference_name) = self;
        reference_name
    }
}

impl From<&str> for ReferenceName {
    fn from(s: &str) -> Self {
        ReferenceName(s.to_owned())
    }
}

impl From<String> for ReferenceName {
    fn from(s: String) -> Self {
        ReferenceName(s)
    }
}

impl AsRef<str> for ReferenceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReferenceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
