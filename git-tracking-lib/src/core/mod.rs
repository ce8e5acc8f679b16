//! Core functionality for resolving, comparing, and synchronizing branches
//! with their upstreams.

pub mod config;
pub mod decision;
pub mod effects;
pub mod error;
pub mod formatting;
pub mod provision;
pub mod relationship;
pub mod report;
pub mod sync;
pub mod tracking;
