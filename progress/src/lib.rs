//! # BrainQuest Progress
//!
//! Client-local progression for a single child: stars, levels, daily streaks,
//! per-subject completion and badges.
//!
//! The crate is split the same way as the server:
//! - **domain**: the pure [`ProgressEngine`], the badge catalog and rules,
//!   star calculators, and the [`ProgressTracker`] that chains them per activity
//! - **storage**: the durable profile store the tracker saves to after every mutation
//!
//! The engine never performs I/O and never fails. Only the tracker touches storage.

pub mod domain;
pub mod storage;

pub use domain::*;
pub use storage::*;
