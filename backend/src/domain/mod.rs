//! # Domain Module
//!
//! Session coordinator business rules: battles, study sessions, presence and
//! friend lists.
//!
//! Services are cheap to clone and share one [`EntityStore`]. Every
//! read-modify-write goes through [`EntityStore::update`], so capacity and
//! status rules hold even when requests race.
//!
//! ## Module Organization
//!
//! - **battle_service**: two-player battles, readiness, scoring, completion
//! - **study_session_service**: hosted study rooms with a participant cap
//! - **presence_service**: heartbeat records and the online list
//! - **friend_service**: one-directional friend edges
//! - **sweeper**: background expiry of stale entities
//! - **entity_store**: typed JSON access with optimistic updates
//! - **errors**: the `SessionError` taxonomy

pub mod battle_service;
pub mod entity_store;
pub mod errors;
pub mod friend_service;
pub mod presence_service;
pub mod study_session_service;
pub mod sweeper;

pub use battle_service::BattleService;
pub use entity_store::EntityStore;
pub use errors::{SessionError, SessionResult};
pub use friend_service::FriendService;
pub use presence_service::PresenceService;
pub use study_session_service::StudySessionService;
pub use sweeper::{ExpirySweeper, SweepReport};

/// `<prefix>-<epoch ms>-<8 hex>`: sortable by creation time, unique within a millisecond
pub(crate) fn generate_id(prefix: &str, now_millis: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, now_millis, &suffix[..8])
}
