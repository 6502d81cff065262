//! # Domain Module
//!
//! Business rules for child progression.
//!
//! ## Module Organization
//!
//! - **progress_engine**: streak, star, level, lesson and badge transitions
//! - **badges**: the fixed 19-badge catalog and the automatic award rules
//! - **rewards**: star calculators and level-progress read models
//! - **progress_tracker**: per-activity orchestration plus persistence
//!
//! ## Business Rules
//!
//! - Level is always `floor(total_stars / 100) + 1`
//! - Total stars never decrease
//! - A lesson id counts at most once
//! - A badge is earned at most once and its earned date is never overwritten
//! - Streaks count consecutive calendar days, reset to 1 after any gap

pub mod badges;
pub mod progress_engine;
pub mod progress_tracker;
pub mod rewards;

pub use badges::*;
pub use progress_engine::*;
pub use progress_tracker::*;
pub use rewards::*;
