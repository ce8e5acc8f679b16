use std::fmt::Display;
use std::str::FromStr;

use eyre::Context;

/// Represents the ID of a Git object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonZeroOid {
    pub(super) inner: git2::Oid,
}

impl std::fmt::Debug for NonZeroOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NonZeroOid({:?})", self.inner)
    }
}

impl Display for NonZeroOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}

impl FromStr for NonZeroOid {
    type Err = eyre::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let oid: git2::Oid = value
            .parse()
            .wrap_err_with(|| format!("Could not parse OID from string: {value:?}"))?;
        if oid.is_zero() {
            eyre::bail!("Expected a non-zero OID, but got: {:?}", value);
        }
        Ok(NonZeroOid { inner: oid })
    }
}

/// Wrap a `git2::Oid` known to be non-zero, such as one resolved from an
/// existing reference. Returns `None` for the zero OID.
pub(super) fn make_non_zero_oid(oid: git2::Oid) -> Option<NonZeroOid> {
    if oid.is_zero() {
        None
    } else {
        Some(NonZeroOid { inner: oid })
    }
}
