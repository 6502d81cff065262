//! # Storage Traits
//!
//! Abstraction over the profile store so the tracker can run against any backend.

use anyhow::Result;
use shared::{ChildProgress, UserProfile};

/// Interface for the device-local profile store
pub trait ProfileStorage: Send + Sync {
    /// Load the saved progress. Missing or malformed data yields `Ok(None)`.
    fn load_progress(&self) -> Result<Option<ChildProgress>>;

    /// Replace the saved progress with this snapshot
    fn save_progress(&self, progress: &ChildProgress) -> Result<()>;

    /// Load the saved identity. Missing or malformed data yields `Ok(None)`.
    fn load_user(&self) -> Result<Option<UserProfile>>;

    fn save_user(&self, user: &UserProfile) -> Result<()>;
}
