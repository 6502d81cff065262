//! # Storage Module
//!
//! Durable, device-local persistence for the child profile.
//!
//! The tracker depends on the [`ProfileStorage`] trait only. The shipped
//! implementation keeps one YAML document per concern in a profile directory:
//!
//! - `user.yaml`: identity captured at signup
//! - `progress.yaml`: the latest [`shared::ChildProgress`] snapshot
//!
//! Unreadable progress is reported as absent so the caller can re-initialize.

pub mod connection;
pub mod profile_repository;
pub mod traits;

pub use connection::ProfileConnection;
pub use profile_repository::ProfileRepository;
pub use traits::ProfileStorage;
