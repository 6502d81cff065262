//! Two-player quiz battles.
//!
//! Lifecycle: `waiting` until both players are ready, then `active` while
//! answers are scored, then `completed` once a client reports the end.

use std::sync::Arc;
use tracing::{debug, info};

use shared::{
    Battle, BattlePlayer, BattleStatus, Clock, CreateBattleRequest, JoinBattleRequest, SubmitAnswerRequest,
    ABANDONED_AFTER_MS, BATTLE_TTL_MS, MAX_BATTLE_PLAYERS,
};

use super::entity_store::EntityStore;
use super::errors::{require_non_empty, SessionError, SessionResult};
use super::generate_id;

pub const BATTLE_PREFIX: &str = "battle:";

/// Answers faster than this earn the speed bonus
pub const FAST_ANSWER_MS: u64 = 5000;
pub const FAST_CORRECT_POINTS: u32 = 15;
pub const CORRECT_POINTS: u32 = 10;

/// Whether the sweeper may drop a battle.
///
/// Waiting battles go once they leave the lobby listing and completed ones a
/// battle window after the result. Active battles are only dropped once
/// abandoned, so players mid-game keep their battle.
pub fn is_expired(battle: &Battle, now: i64) -> bool {
    match battle.status {
        BattleStatus::Waiting => now - battle.created_at >= BATTLE_TTL_MS,
        BattleStatus::Active => now - battle.created_at >= ABANDONED_AFTER_MS,
        BattleStatus::Completed => now - battle.completed_at.unwrap_or(battle.created_at) >= BATTLE_TTL_MS,
    }
}

/// Points for one answer
pub fn answer_points(correct: bool, response_time_ms: u64) -> u32 {
    match (correct, response_time_ms < FAST_ANSWER_MS) {
        (false, _) => 0,
        (true, true) => FAST_CORRECT_POINTS,
        (true, false) => CORRECT_POINTS,
    }
}

/// Highest scorer, or `None` when the top score is shared
pub fn decide_winner(players: &[BattlePlayer]) -> Option<String> {
    let top = players.iter().map(|p| p.score).max()?;
    let mut leaders = players.iter().filter(|p| p.score == top);
    let winner = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }
    Some(winner.user_id.clone())
}

#[derive(Clone)]
pub struct BattleService {
    entities: EntityStore,
    clock: Arc<dyn Clock>,
}

impl BattleService {
    pub fn new(entities: EntityStore, clock: Arc<dyn Clock>) -> Self {
        Self { entities, clock }
    }

    fn key(battle_id: &str) -> String {
        format!("{}{}", BATTLE_PREFIX, battle_id)
    }

    pub async fn create_battle(&self, request: CreateBattleRequest) -> SessionResult<Battle> {
        require_non_empty("hostId", &request.host_id)?;
        require_non_empty("hostName", &request.host_name)?;

        let now = self.clock.now_millis();
        let battle = Battle {
            id: generate_id("battle", now),
            subject: request.subject,
            difficulty: request.difficulty.unwrap_or_default(),
            players: vec![BattlePlayer {
                user_id: request.host_id,
                name: request.host_name,
                avatar: request.host_avatar,
                score: 0,
                ready: false,
                answered: 0,
            }],
            status: BattleStatus::Waiting,
            created_at: now,
            completed_at: None,
            winner_id: None,
        };

        self.entities.put(&Self::key(&battle.id), &battle).await?;
        info!("Created battle {} ({}, {:?})", battle.id, battle.subject, battle.difficulty);
        Ok(battle)
    }

    /// Battles younger than the battle window that have not completed, newest first
    pub async fn list_battles(&self) -> SessionResult<Vec<Battle>> {
        let now = self.clock.now_millis();
        let mut battles: Vec<Battle> = self
            .entities
            .list::<Battle>(BATTLE_PREFIX)
            .await?
            .into_iter()
            .map(|stored| stored.value)
            .filter(|battle| now - battle.created_at < BATTLE_TTL_MS && battle.status != BattleStatus::Completed)
            .collect();
        battles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(battles)
    }

    pub async fn get_battle(&self, battle_id: &str) -> SessionResult<Battle> {
        self.entities
            .get::<Battle>(&Self::key(battle_id))
            .await?
            .ok_or_else(|| SessionError::battle_not_found(battle_id))
    }

    /// Join as the second player. Joining again is a no-op.
    pub async fn join_battle(&self, battle_id: &str, request: JoinBattleRequest) -> SessionResult<Battle> {
        require_non_empty("userId", &request.user_id)?;
        require_non_empty("name", &request.name)?;

        let battle = self
            .entities
            .update(&Self::key(battle_id), |current: Option<Battle>| {
                let mut battle = current.ok_or_else(|| SessionError::battle_not_found(battle_id))?;
                if battle.has_player(&request.user_id) {
                    return Ok(battle);
                }
                if battle.players.len() >= MAX_BATTLE_PLAYERS {
                    return Err(SessionError::BattleFull);
                }
                if battle.status != BattleStatus::Waiting {
                    return Err(SessionError::AlreadyStarted);
                }
                battle.players.push(BattlePlayer {
                    user_id: request.user_id.clone(),
                    name: request.name.clone(),
                    avatar: request.avatar.clone(),
                    score: 0,
                    ready: false,
                    answered: 0,
                });
                Ok(battle)
            })
            .await?;

        info!("{} is in battle {} ({} players)", request.user_id, battle_id, battle.players.len());
        Ok(battle)
    }

    /// Mark a player ready; the battle goes active once both players are
    pub async fn set_ready(&self, battle_id: &str, user_id: &str) -> SessionResult<Battle> {
        require_non_empty("userId", user_id)?;

        let battle = self
            .entities
            .update(&Self::key(battle_id), |current: Option<Battle>| {
                let mut battle = current.ok_or_else(|| SessionError::battle_not_found(battle_id))?;
                if let Some(player) = battle.players.iter_mut().find(|p| p.user_id == user_id) {
                    player.ready = true;
                }
                if battle.status == BattleStatus::Waiting
                    && battle.players.len() == MAX_BATTLE_PLAYERS
                    && battle.players.iter().all(|p| p.ready)
                {
                    battle.status = BattleStatus::Active;
                }
                Ok(battle)
            })
            .await?;

        if battle.status == BattleStatus::Active {
            debug!("Battle {} is active", battle_id);
        }
        Ok(battle)
    }

    /// Score one answer for one player.
    ///
    /// With `questionIndex` the answer must be for the player's next
    /// unanswered question, which stops replays from inflating the score.
    pub async fn submit_answer(&self, battle_id: &str, request: SubmitAnswerRequest) -> SessionResult<Battle> {
        require_non_empty("userId", &request.user_id)?;

        let points = answer_points(request.correct, request.response_time);
        self.entities
            .update(&Self::key(battle_id), |current: Option<Battle>| {
                let mut battle = current.ok_or_else(|| SessionError::battle_not_found(battle_id))?;
                match battle.status {
                    BattleStatus::Active => {}
                    BattleStatus::Waiting => {
                        return Err(SessionError::InvalidTransition("Battle has not started".to_string()))
                    }
                    BattleStatus::Completed => {
                        return Err(SessionError::InvalidTransition("Battle already completed".to_string()))
                    }
                }
                let Some(position) = battle.players.iter().position(|p| p.user_id == request.user_id) else {
                    return Ok(battle);
                };
                let player = &mut battle.players[position];
                if let Some(index) = request.question_index {
                    if index != player.answered {
                        return Err(SessionError::AnswerOutOfOrder {
                            expected: player.answered,
                            submitted: index,
                        });
                    }
                }
                player.score = player.score.saturating_add(points);
                player.answered = player.answered.saturating_add(1);
                Ok(battle)
            })
            .await
    }

    /// Finish an active battle and record the winner.
    ///
    /// Both clients report the end, so completing twice returns the
    /// already-completed battle.
    pub async fn complete_battle(&self, battle_id: &str) -> SessionResult<Battle> {
        let now = self.clock.now_millis();
        let battle = self
            .entities
            .update(&Self::key(battle_id), |current: Option<Battle>| {
                let mut battle = current.ok_or_else(|| SessionError::battle_not_found(battle_id))?;
                match battle.status {
                    BattleStatus::Completed => Ok(battle),
                    BattleStatus::Waiting => Err(SessionError::InvalidTransition(
                        "Battle has not started".to_string(),
                    )),
                    BattleStatus::Active => {
                        battle.status = BattleStatus::Completed;
                        battle.completed_at = Some(now);
                        battle.winner_id = decide_winner(&battle.players);
                        Ok(battle)
                    }
                }
            })
            .await?;

        info!("Battle {} completed, winner: {:?}", battle.id, battle.winner_id);
        Ok(battle)
    }

    /// Delete battles the sweeper may drop, see [`is_expired`]
    pub async fn purge_expired(&self) -> SessionResult<usize> {
        let now = self.clock.now_millis();
        let mut removed = 0;
        for stored in self.entities.list::<Battle>(BATTLE_PREFIX).await? {
            if is_expired(&stored.value, now)
                && self.entities.delete_if_unchanged(&stored.key, stored.version).await?
            {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Purged {} expired battles", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{Duration, NaiveDate};
    use shared::{Difficulty, FixedClock, Subject};

    fn setup_test() -> (BattleService, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let entities = EntityStore::new(Arc::new(MemoryStore::new()));
        (BattleService::new(entities, clock.clone()), clock)
    }

    fn create_request(host: &str) -> CreateBattleRequest {
        CreateBattleRequest {
            host_id: host.to_string(),
            host_name: host.to_uppercase(),
            host_avatar: "lion".to_string(),
            subject: Subject::Math,
            difficulty: None,
        }
    }

    fn join_request(user: &str) -> JoinBattleRequest {
        JoinBattleRequest {
            user_id: user.to_string(),
            name: user.to_uppercase(),
            avatar: "owl".to_string(),
        }
    }

    fn answer(user: &str, correct: bool, response_time: u64, question_index: Option<u32>) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            user_id: user.to_string(),
            correct,
            response_time,
            question_index,
        }
    }

    async fn active_battle(service: &BattleService) -> Battle {
        let battle = service.create_battle(create_request("a")).await.unwrap();
        service.join_battle(&battle.id, join_request("b")).await.unwrap();
        service.set_ready(&battle.id, "a").await.unwrap();
        service.set_ready(&battle.id, "b").await.unwrap()
    }

    #[test]
    fn test_answer_points() {
        assert_eq!(answer_points(true, 1200), 15);
        assert_eq!(answer_points(true, 4999), 15);
        assert_eq!(answer_points(true, 5000), 10);
        assert_eq!(answer_points(false, 100), 0);
    }

    #[tokio::test]
    async fn test_create_battle_defaults() {
        let (service, clock) = setup_test();

        let battle = service.create_battle(create_request("a")).await.unwrap();

        assert!(battle.id.starts_with(&format!("battle-{}-", clock.now_millis())));
        assert_eq!(battle.difficulty, Difficulty::Easy);
        assert_eq!(battle.status, BattleStatus::Waiting);
        assert_eq!(battle.players.len(), 1);
        assert_eq!(service.get_battle(&battle.id).await.unwrap(), battle);
    }

    #[tokio::test]
    async fn test_two_players_ready_starts_battle_and_third_is_rejected() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();

        let joined = service.join_battle(&battle.id, join_request("b")).await.unwrap();
        assert_eq!(joined.players.len(), 2);

        let after_a = service.set_ready(&battle.id, "a").await.unwrap();
        assert_eq!(after_a.status, BattleStatus::Waiting);
        let after_b = service.set_ready(&battle.id, "b").await.unwrap();
        assert_eq!(after_b.status, BattleStatus::Active);

        let result = service.join_battle(&battle.id, join_request("c")).await;
        assert!(matches!(result, Err(SessionError::BattleFull)));
        assert_eq!(service.get_battle(&battle.id).await.unwrap().players.len(), 2);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();

        service.join_battle(&battle.id, join_request("b")).await.unwrap();
        let again = service.join_battle(&battle.id, join_request("b")).await.unwrap();
        let host_again = service.join_battle(&battle.id, join_request("a")).await.unwrap();

        assert_eq!(again.players.len(), 2);
        assert_eq!(host_again.players.len(), 2);
    }

    #[tokio::test]
    async fn test_join_missing_battle() {
        let (service, _clock) = setup_test();
        let result = service.join_battle("battle-nope", join_request("b")).await;
        assert!(matches!(result, Err(SessionError::NotFound { kind: "Battle", .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_never_exceed_two_players() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("host")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            let battle_id = battle.id.clone();
            handles.push(tokio::spawn(async move {
                service.join_battle(&battle_id, join_request(&format!("kid{}", i))).await
            }));
        }

        let mut joined = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => joined += 1,
                Err(SessionError::BattleFull) | Err(SessionError::ConcurrentUpdate(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(joined, 1);
        assert_eq!(service.get_battle(&battle.id).await.unwrap().players.len(), 2);
    }

    #[tokio::test]
    async fn test_ready_for_unknown_player_is_a_no_op() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();

        let after = service.set_ready(&battle.id, "stranger").await.unwrap();
        assert_eq!(after, battle);
    }

    #[tokio::test]
    async fn test_single_ready_player_does_not_start() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();

        let after = service.set_ready(&battle.id, "a").await.unwrap();
        assert_eq!(after.status, BattleStatus::Waiting);
        assert!(after.players[0].ready);
    }

    #[tokio::test]
    async fn test_join_after_start_is_rejected() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();
        service.join_battle(&battle.id, join_request("b")).await.unwrap();
        service.set_ready(&battle.id, "a").await.unwrap();
        service.set_ready(&battle.id, "b").await.unwrap();

        // Drop to one player to reach the status check behind the capacity check
        let mut stored = service.get_battle(&battle.id).await.unwrap();
        stored.players.pop();
        service.entities.put(&BattleService::key(&battle.id), &stored).await.unwrap();

        let result = service.join_battle(&battle.id, join_request("c")).await;
        assert!(matches!(result, Err(SessionError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_answers_score_and_count() {
        let (service, _clock) = setup_test();
        let battle = active_battle(&service).await;

        service.submit_answer(&battle.id, answer("a", true, 1000, Some(0))).await.unwrap();
        service.submit_answer(&battle.id, answer("a", true, 8000, Some(1))).await.unwrap();
        let after = service.submit_answer(&battle.id, answer("b", false, 1000, None)).await.unwrap();

        let a = after.player("a").unwrap();
        assert_eq!(a.score, 25);
        assert_eq!(a.answered, 2);
        let b = after.player("b").unwrap();
        assert_eq!(b.score, 0);
        assert_eq!(b.answered, 1);
    }

    #[tokio::test]
    async fn test_replayed_answer_is_rejected() {
        let (service, _clock) = setup_test();
        let battle = active_battle(&service).await;

        service.submit_answer(&battle.id, answer("a", true, 1000, Some(0))).await.unwrap();
        let replay = service.submit_answer(&battle.id, answer("a", true, 1000, Some(0))).await;

        assert!(matches!(
            replay,
            Err(SessionError::AnswerOutOfOrder { expected: 1, submitted: 0 })
        ));
        assert_eq!(service.get_battle(&battle.id).await.unwrap().player("a").unwrap().score, 15);
    }

    #[tokio::test]
    async fn test_answer_from_non_player_changes_nothing() {
        let (service, _clock) = setup_test();
        let battle = active_battle(&service).await;

        let after = service.submit_answer(&battle.id, answer("stranger", true, 10, None)).await.unwrap();
        assert_eq!(after, battle);
    }

    #[tokio::test]
    async fn test_complete_battle_picks_winner() {
        let (service, clock) = setup_test();
        let battle = active_battle(&service).await;
        service.submit_answer(&battle.id, answer("b", true, 1000, None)).await.unwrap();

        let done = service.complete_battle(&battle.id).await.unwrap();

        assert_eq!(done.status, BattleStatus::Completed);
        assert_eq!(done.winner_id.as_deref(), Some("b"));
        assert_eq!(done.completed_at, Some(clock.now_millis()));

        // Second report is accepted and changes nothing
        assert_eq!(service.complete_battle(&battle.id).await.unwrap(), done);

        let late = service.submit_answer(&battle.id, answer("a", true, 1000, None)).await;
        assert!(matches!(late, Err(SessionError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_complete_tied_battle_has_no_winner() {
        let (service, _clock) = setup_test();
        let battle = active_battle(&service).await;

        let done = service.complete_battle(&battle.id).await.unwrap();
        assert_eq!(done.winner_id, None);
    }

    #[tokio::test]
    async fn test_complete_waiting_battle_is_rejected() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();

        let result = service.complete_battle(&battle.id).await;
        assert!(matches!(result, Err(SessionError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_listing_hides_old_and_completed_battles() {
        let (service, clock) = setup_test();

        let old = service.create_battle(create_request("old")).await.unwrap();
        clock.advance(Duration::minutes(20));
        let finished = active_battle(&service).await;
        service.complete_battle(&finished.id).await.unwrap();
        let fresh = service.create_battle(create_request("fresh")).await.unwrap();

        let listed: Vec<String> = service.list_battles().await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&old.id));
        assert!(listed.contains(&fresh.id));

        clock.advance(Duration::minutes(10));
        let listed: Vec<String> = service.list_battles().await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(listed, vec![fresh.id.clone()]);

        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(service.get_battle(&old.id).await.is_err());
    }

    #[tokio::test]
    async fn test_answer_before_start_is_rejected() {
        let (service, _clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();
        service.join_battle(&battle.id, join_request("b")).await.unwrap();
        service.set_ready(&battle.id, "a").await.unwrap();

        let early = service.submit_answer(&battle.id, answer("a", true, 1000, Some(0))).await;

        assert!(matches!(early, Err(SessionError::InvalidTransition(_))));
        let stored = service.get_battle(&battle.id).await.unwrap();
        assert_eq!(stored.player("a").unwrap().score, 0);
        assert_eq!(stored.player("a").unwrap().answered, 0);
    }

    #[tokio::test]
    async fn test_active_battle_outlives_the_battle_window() {
        let (service, clock) = setup_test();
        let battle = service.create_battle(create_request("a")).await.unwrap();
        clock.advance(Duration::minutes(28));
        service.join_battle(&battle.id, join_request("b")).await.unwrap();
        service.set_ready(&battle.id, "a").await.unwrap();
        service.set_ready(&battle.id, "b").await.unwrap();
        clock.advance(Duration::minutes(3));

        assert_eq!(service.purge_expired().await.unwrap(), 0);
        let done = service.complete_battle(&battle.id).await.unwrap();
        assert_eq!(done.status, BattleStatus::Completed);

        // Result stays readable for a battle window after completion
        clock.advance(Duration::minutes(29));
        assert_eq!(service.purge_expired().await.unwrap(), 0);
        clock.advance(Duration::minutes(1));
        assert_eq!(service.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_active_battle_is_purged() {
        let (service, clock) = setup_test();
        let battle = active_battle(&service).await;

        clock.advance(Duration::hours(23));
        assert_eq!(service.purge_expired().await.unwrap(), 0);
        clock.advance(Duration::hours(1));
        assert_eq!(service.purge_expired().await.unwrap(), 1);
        assert!(service.get_battle(&battle.id).await.is_err());
    }
}
