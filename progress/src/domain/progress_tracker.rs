//! Per-activity orchestration for the child's progress.
//!
//! The tracker is what the presentation layer calls when a lesson, battle or
//! study session finishes. Each activity runs the same chain:
//! streak → stars → lesson → automatic badges, and the result is saved
//! before it is returned.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use shared::{Badge, ChildProgress, Subject, UserProfile};

use super::badges::newly_earned_badges;
use super::progress_engine::ProgressEngine;
use super::rewards::{battle_stars, lesson_stars, study_session_stars};
use crate::storage::ProfileStorage;

/// A finished solo lesson
#[derive(Debug, Clone)]
pub struct LessonCompletion {
    pub subject: Subject,
    pub lesson_id: String,
    pub correct_answers: u32,
    pub total_questions: u32,
}

/// A finished battle, as seen by the local player
#[derive(Debug, Clone)]
pub struct BattleCompletion {
    pub battle_id: String,
    pub subject: Option<Subject>,
    pub won: bool,
}

/// A finished study session
#[derive(Debug, Clone)]
pub struct StudySessionCompletion {
    pub session_id: String,
    pub subject: Option<Subject>,
    pub correct_answers: u32,
    pub total_questions: u32,
}

/// What the reward screen needs after an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityOutcome {
    pub progress: ChildProgress,
    pub earned_stars: u32,
    pub new_badges: Vec<Badge>,
}

/// Applies activities to the stored progress and persists every change
pub struct ProgressTracker<S: ProfileStorage> {
    engine: ProgressEngine,
    storage: S,
}

impl<S: ProfileStorage> ProgressTracker<S> {
    pub fn new(engine: ProgressEngine, storage: S) -> Self {
        Self { engine, storage }
    }

    pub fn engine(&self) -> &ProgressEngine {
        &self.engine
    }

    /// Create and save the initial progress for a new child
    pub fn signup(&self, profile: UserProfile) -> Result<ChildProgress> {
        info!("Signing up {} (age {}, grade {})", profile.name, profile.age, profile.grade);
        let progress = self.engine.create_initial_progress(&profile);
        self.storage.save_user(&profile)?;
        self.storage.save_progress(&progress)?;
        Ok(progress)
    }

    /// Saved progress, or `None` when the caller must run signup again
    pub fn load(&self) -> Result<Option<ChildProgress>> {
        let progress = self.storage.load_progress()?;
        if progress.is_none() {
            warn!("No usable saved progress, profile needs to be re-initialized");
        }
        Ok(progress)
    }

    pub fn load_user(&self) -> Result<Option<UserProfile>> {
        self.storage.load_user()
    }

    pub fn record_lesson(&self, progress: &ChildProgress, lesson: LessonCompletion) -> Result<ActivityOutcome> {
        let stars = lesson_stars(lesson.correct_answers, lesson.total_questions);
        info!(
            "Lesson {} finished with {}/{} correct, {} stars",
            lesson.lesson_id, lesson.correct_answers, lesson.total_questions, stars
        );
        self.apply_activity(progress, stars, Some((lesson.subject, lesson.lesson_id)))
    }

    pub fn record_battle(&self, progress: &ChildProgress, battle: BattleCompletion) -> Result<ActivityOutcome> {
        let stars = battle_stars(battle.won);
        info!("Battle {} finished, won: {}, {} stars", battle.battle_id, battle.won, stars);
        let lesson = battle
            .subject
            .map(|subject| (subject, format!("battle-{}-{}", subject, battle.battle_id)));
        self.apply_activity(progress, stars, lesson)
    }

    pub fn record_study_session(
        &self,
        progress: &ChildProgress,
        session: StudySessionCompletion,
    ) -> Result<ActivityOutcome> {
        let stars = study_session_stars(session.correct_answers, session.total_questions);
        info!("Study session {} finished, {} stars", session.session_id, stars);
        let lesson = session
            .subject
            .map(|subject| (subject, format!("study-{}-{}", subject, session.session_id)));
        self.apply_activity(progress, stars, lesson)
    }

    /// Joining a battle or study session earns Team Player once
    pub fn join_multiplayer(&self, progress: &ChildProgress) -> Result<ActivityOutcome> {
        let updated = self.engine.award_team_player_badge(progress);
        let new_badges = newly_earned_badges(progress, &updated);
        if !new_badges.is_empty() {
            info!("{} earned Team Player", updated.name);
            self.storage.save_progress(&updated)?;
        }
        Ok(ActivityOutcome {
            progress: updated,
            earned_stars: 0,
            new_badges,
        })
    }

    fn apply_activity(
        &self,
        progress: &ChildProgress,
        stars: u32,
        lesson: Option<(Subject, String)>,
    ) -> Result<ActivityOutcome> {
        let mut updated = self.engine.update_streak(progress);
        updated = self.engine.add_stars(&updated, stars);
        if let Some((subject, lesson_id)) = lesson {
            updated = self.engine.complete_lesson(&updated, subject.id(), &lesson_id);
        }
        updated = self.engine.check_and_award_badges(&updated);

        self.storage.save_progress(&updated)?;

        let new_badges = newly_earned_badges(progress, &updated);
        for badge in &new_badges {
            info!("New badge earned: {} {}", badge.icon, badge.name);
        }
        Ok(ActivityOutcome {
            progress: updated,
            earned_stars: stars,
            new_badges,
        })
    }
}
