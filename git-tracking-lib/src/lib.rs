//! Core functionality for git-tracking.
//!
//! The interesting logic lives in [`core`]: resolving which remote branch a
//! local branch tracks, measuring how far apart the two histories are,
//! deciding how to bring them back together, and provisioning tracking
//! relationships without losing commits. Everything in [`git`] is the narrow
//! interface to the underlying repository.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

pub mod core;
pub mod git;
pub mod testing;
pub mod util;
