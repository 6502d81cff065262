use std::sync::Arc;
use tracing::info;

use shared::{
    Clock, CreateStudySessionRequest, JoinStudySessionRequest, Participant, SessionStatus, StudySession,
    ABANDONED_AFTER_MS, DEFAULT_MAX_PARTICIPANTS, MAX_MAX_PARTICIPANTS, MIN_MAX_PARTICIPANTS, STUDY_SESSION_TTL_MS,
};

use super::entity_store::EntityStore;
use super::errors::{require_non_empty, SessionError, SessionResult};
use super::generate_id;

pub const STUDY_SESSION_PREFIX: &str = "study-session:";

/// Whether the sweeper may drop a session. Active sessions are kept until
/// abandoned, however long the group studies.
pub fn is_expired(session: &StudySession, now: i64) -> bool {
    match session.status {
        SessionStatus::Waiting => now - session.created_at >= STUDY_SESSION_TTL_MS,
        SessionStatus::Active => now - session.created_at >= ABANDONED_AFTER_MS,
        SessionStatus::Completed => {
            now - session.completed_at.unwrap_or(session.created_at) >= STUDY_SESSION_TTL_MS
        }
    }
}

/// Group study rooms with a host and a capacity
#[derive(Clone)]
pub struct StudySessionService {
    entities: EntityStore,
    clock: Arc<dyn Clock>,
}

impl StudySessionService {
    pub fn new(entities: EntityStore, clock: Arc<dyn Clock>) -> Self {
        Self { entities, clock }
    }

    fn key(session_id: &str) -> String {
        format!("{}{}", STUDY_SESSION_PREFIX, session_id)
    }

    pub async fn create_study_session(&self, request: CreateStudySessionRequest) -> SessionResult<StudySession> {
        require_non_empty("hostId", &request.host_id)?;
        require_non_empty("hostName", &request.host_name)?;

        let max_participants = request.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);
        if !(MIN_MAX_PARTICIPANTS..=MAX_MAX_PARTICIPANTS).contains(&max_participants) {
            return Err(SessionError::Validation(format!(
                "maxParticipants must be between {} and {}",
                MIN_MAX_PARTICIPANTS, MAX_MAX_PARTICIPANTS
            )));
        }

        let now = self.clock.now_millis();
        let session = StudySession {
            id: generate_id("session", now),
            host_id: request.host_id.clone(),
            host_name: request.host_name.clone(),
            subject: request.subject,
            max_participants,
            participants: vec![Participant {
                user_id: request.host_id,
                name: request.host_name,
            }],
            status: SessionStatus::Waiting,
            created_at: now,
            completed_at: None,
        };

        self.entities.put(&Self::key(&session.id), &session).await?;
        info!(
            "Created study session {} ({}, up to {} participants)",
            session.id, session.subject, session.max_participants
        );
        Ok(session)
    }

    /// Sessions younger than the session window that have not completed, newest first
    pub async fn list_study_sessions(&self) -> SessionResult<Vec<StudySession>> {
        let now = self.clock.now_millis();
        let mut sessions: Vec<StudySession> = self
            .entities
            .list::<StudySession>(STUDY_SESSION_PREFIX)
            .await?
            .into_iter()
            .map(|stored| stored.value)
            .filter(|session| {
                now - session.created_at < STUDY_SESSION_TTL_MS && session.status != SessionStatus::Completed
            })
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    pub async fn get_study_session(&self, session_id: &str) -> SessionResult<StudySession> {
        self.entities
            .get::<StudySession>(&Self::key(session_id))
            .await?
            .ok_or_else(|| SessionError::session_not_found(session_id))
    }

    /// Join a session with room left. Joining again is a no-op.
    pub async fn join_study_session(
        &self,
        session_id: &str,
        request: JoinStudySessionRequest,
    ) -> SessionResult<StudySession> {
        require_non_empty("userId", &request.user_id)?;
        require_non_empty("name", &request.name)?;

        let session = self
            .entities
            .update(&Self::key(session_id), |current: Option<StudySession>| {
                let mut session = current.ok_or_else(|| SessionError::session_not_found(session_id))?;
                if session.has_participant(&request.user_id) {
                    return Ok(session);
                }
                if session.status == SessionStatus::Completed {
                    return Err(SessionError::InvalidTransition("Session already completed".to_string()));
                }
                if session.is_full() {
                    return Err(SessionError::SessionFull);
                }
                session.participants.push(Participant {
                    user_id: request.user_id.clone(),
                    name: request.name.clone(),
                });
                Ok(session)
            })
            .await?;

        info!(
            "{} is in study session {} ({}/{})",
            request.user_id,
            session_id,
            session.participants.len(),
            session.max_participants
        );
        Ok(session)
    }

    /// Host starts the session: waiting → active
    pub async fn start_study_session(&self, session_id: &str, user_id: &str) -> SessionResult<StudySession> {
        require_non_empty("userId", user_id)?;

        let session = self
            .entities
            .update(&Self::key(session_id), |current: Option<StudySession>| {
                let mut session = current.ok_or_else(|| SessionError::session_not_found(session_id))?;
                if session.host_id != user_id {
                    return Err(SessionError::Validation("Only the host can start the session".to_string()));
                }
                match session.status {
                    SessionStatus::Active => Ok(session),
                    SessionStatus::Completed => {
                        Err(SessionError::InvalidTransition("Session already completed".to_string()))
                    }
                    SessionStatus::Waiting => {
                        session.status = SessionStatus::Active;
                        Ok(session)
                    }
                }
            })
            .await?;

        info!("Study session {} started", session_id);
        Ok(session)
    }

    /// active → completed. Completing twice returns the completed session.
    pub async fn complete_study_session(&self, session_id: &str) -> SessionResult<StudySession> {
        let now = self.clock.now_millis();
        let session = self
            .entities
            .update(&Self::key(session_id), |current: Option<StudySession>| {
                let mut session = current.ok_or_else(|| SessionError::session_not_found(session_id))?;
                match session.status {
                    SessionStatus::Completed => Ok(session),
                    SessionStatus::Waiting => {
                        Err(SessionError::InvalidTransition("Session has not started".to_string()))
                    }
                    SessionStatus::Active => {
                        session.status = SessionStatus::Completed;
                        session.completed_at = Some(now);
                        Ok(session)
                    }
                }
            })
            .await?;

        info!("Study session {} completed", session_id);
        Ok(session)
    }

    /// Delete sessions the sweeper may drop, see [`is_expired`]
    pub async fn purge_expired(&self) -> SessionResult<usize> {
        let now = self.clock.now_millis();
        let mut removed = 0;
        for stored in self.entities.list::<StudySession>(STUDY_SESSION_PREFIX).await? {
            if is_expired(&stored.value, now)
                && self.entities.delete_if_unchanged(&stored.key, stored.version).await?
            {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Purged {} expired study sessions", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{Duration, NaiveDate};
    use shared::{FixedClock, Subject};

    fn setup_test() -> (StudySessionService, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let entities = EntityStore::new(Arc::new(MemoryStore::new()));
        (StudySessionService::new(entities, clock.clone()), clock)
    }

    fn create_request(max_participants: Option<u32>) -> CreateStudySessionRequest {
        CreateStudySessionRequest {
            host_id: "host".to_string(),
            host_name: "Hana".to_string(),
            subject: Subject::Reading,
            max_participants,
        }
    }

    fn join_request(user: &str) -> JoinStudySessionRequest {
        JoinStudySessionRequest {
            user_id: user.to_string(),
            name: user.to_uppercase(),
        }
    }

    #[tokio::test]
    async fn test_create_session_defaults() {
        let (service, clock) = setup_test();

        let session = service.create_study_session(create_request(None)).await.unwrap();

        assert!(session.id.starts_with(&format!("session-{}-", clock.now_millis())));
        assert_eq!(session.max_participants, 4);
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(session.participants, vec![Participant { user_id: "host".to_string(), name: "Hana".to_string() }]);
    }

    #[tokio::test]
    async fn test_max_participants_bounds() {
        let (service, _clock) = setup_test();

        for bad in [0, 1, 11] {
            let result = service.create_study_session(create_request(Some(bad))).await;
            assert!(matches!(result, Err(SessionError::Validation(_))), "{} should be rejected", bad);
        }
        assert!(service.create_study_session(create_request(Some(2))).await.is_ok());
        assert!(service.create_study_session(create_request(Some(10))).await.is_ok());
    }

    #[tokio::test]
    async fn test_join_until_full() {
        let (service, _clock) = setup_test();
        let session = service.create_study_session(create_request(Some(3))).await.unwrap();

        service.join_study_session(&session.id, join_request("b")).await.unwrap();
        let full = service.join_study_session(&session.id, join_request("c")).await.unwrap();
        assert_eq!(full.participants.len(), 3);

        let result = service.join_study_session(&session.id, join_request("d")).await;
        assert!(matches!(result, Err(SessionError::SessionFull)));

        // Already inside, so a full room still accepts the repeat
        let again = service.join_study_session(&session.id, join_request("c")).await.unwrap();
        assert_eq!(again.participants.len(), 3);
    }

    #[tokio::test]
    async fn test_join_missing_session() {
        let (service, _clock) = setup_test();
        let result = service.join_study_session("session-nope", join_request("b")).await;
        assert!(matches!(result, Err(SessionError::NotFound { kind: "Session", .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_respect_capacity() {
        let (service, _clock) = setup_test();
        let session = service.create_study_session(create_request(Some(4))).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let service = service.clone();
            let session_id = session.id.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    match service.join_study_session(&session_id, join_request(&format!("kid{}", i))).await {
                        Err(SessionError::ConcurrentUpdate(_)) => continue,
                        other => return other,
                    }
                }
            }));
        }

        let mut joined = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => joined += 1,
                Err(SessionError::SessionFull) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(joined, 3);
        assert_eq!(service.get_study_session(&session.id).await.unwrap().participants.len(), 4);
    }

    #[tokio::test]
    async fn test_start_and_complete() {
        let (service, clock) = setup_test();
        let session = service.create_study_session(create_request(None)).await.unwrap();
        service.join_study_session(&session.id, join_request("b")).await.unwrap();

        let not_host = service.start_study_session(&session.id, "b").await;
        assert!(matches!(not_host, Err(SessionError::Validation(_))));

        let early = service.complete_study_session(&session.id).await;
        assert!(matches!(early, Err(SessionError::InvalidTransition(_))));

        let started = service.start_study_session(&session.id, "host").await.unwrap();
        assert_eq!(started.status, SessionStatus::Active);

        // Late joiners may still enter an active session
        service.join_study_session(&session.id, join_request("c")).await.unwrap();

        let done = service.complete_study_session(&session.id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.completed_at, Some(clock.now_millis()));
        assert_eq!(service.complete_study_session(&session.id).await.unwrap(), done);

        let closed = service.join_study_session(&session.id, join_request("d")).await;
        assert!(matches!(closed, Err(SessionError::InvalidTransition(_))));
        assert!(service.list_study_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_window_and_purge() {
        let (service, clock) = setup_test();

        let old = service.create_study_session(create_request(None)).await.unwrap();
        clock.advance(Duration::minutes(59));
        let fresh = service.create_study_session(create_request(None)).await.unwrap();

        assert_eq!(service.list_study_sessions().await.unwrap().len(), 2);

        clock.advance(Duration::minutes(1));
        let listed = service.list_study_sessions().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, fresh.id);

        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(matches!(
            service.get_study_session(&old.id).await,
            Err(SessionError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_long_running_session_is_kept() {
        let (service, clock) = setup_test();
        let session = service.create_study_session(create_request(None)).await.unwrap();
        service.start_study_session(&session.id, "host").await.unwrap();

        clock.advance(Duration::minutes(90));
        assert_eq!(service.purge_expired().await.unwrap(), 0);
        let done = service.complete_study_session(&session.id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);

        clock.advance(Duration::minutes(59));
        assert_eq!(service.purge_expired().await.unwrap(), 0);
        clock.advance(Duration::minutes(1));
        assert_eq!(service.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_session_is_purged() {
        let (service, clock) = setup_test();
        let session = service.create_study_session(create_request(None)).await.unwrap();
        service.start_study_session(&session.id, "host").await.unwrap();

        clock.advance(Duration::hours(24));
        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(service.get_study_session(&session.id).await.is_err());
    }
}
