//! Keep local Git branches in step with the remote branches they track.
//!
//! Each local branch may track one branch on a remote. `git tracking` can set
//! that relationship up without losing commits, show how far a branch has
//! drifted from its upstream, and bring branches back in line by
//! fast-forwarding, rebasing, or merging.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

pub mod commands;
