//! Periodic removal of expired battles, study sessions and presence records.
//!
//! Listing endpoints filter by age on their own; the sweeper only keeps the
//! store from growing without bound.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::battle_service::BattleService;
use super::presence_service::PresenceService;
use super::study_session_service::StudySessionService;

/// What one sweep removed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub battles: usize,
    pub study_sessions: usize,
    pub presence: usize,
}

#[derive(Clone)]
pub struct ExpirySweeper {
    battles: BattleService,
    study_sessions: StudySessionService,
    presence: PresenceService,
}

impl ExpirySweeper {
    pub fn new(battles: BattleService, study_sessions: StudySessionService, presence: PresenceService) -> Self {
        Self {
            battles,
            study_sessions,
            presence,
        }
    }

    /// Run a single sweep. A failure in one entity type does not stop the others.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.battles.purge_expired().await {
            Ok(count) => report.battles = count,
            Err(e) => error!("Failed to purge battles: {}", e),
        }
        match self.study_sessions.purge_expired().await {
            Ok(count) => report.study_sessions = count,
            Err(e) => error!("Failed to purge study sessions: {}", e),
        }
        match self.presence.purge_expired().await {
            Ok(count) => report.presence = count,
            Err(e) => error!("Failed to purge presence records: {}", e),
        }

        report
    }

    /// Sweep on a fixed interval until the task is aborted
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        info!("Expiry sweeper running every {:?}", interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}
