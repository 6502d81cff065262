//! Progress engine for the BrainQuest progression system.
//!
//! Every operation takes a snapshot by reference and returns a new, fully
//! consistent snapshot. The input is never modified and no operation fails.
//!
//! ## Business Rules
//!
//! - `level = floor(total_stars / 100) + 1`, recomputed on every star change
//! - Streak: gap of 1 day increments, gap over 1 day resets to 1, same day keeps it
//! - A lesson id already in `completed_lessons` makes `complete_lesson` a no-op
//! - Subject percentage is `round(completed / total * 100)`, clamped to 100
//! - Badges are awarded once; the first earned date sticks

use std::sync::Arc;

use shared::{ChildProgress, Clock, Subject, SubjectProgress, SystemClock, UserProfile};
use tracing::debug;

use super::badges::{badge_catalog, BADGE_RULES, TEAM_PLAYER};

pub const STARS_PER_LEVEL: u32 = 100;

/// Level reached with a given cumulative star count
pub fn level_for_stars(total_stars: u32) -> u32 {
    total_stars / STARS_PER_LEVEL + 1
}

/// Rounded completion percentage, clamped to 100
pub fn subject_percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let percentage = (f64::from(completed) / f64::from(total) * 100.0).round();
    percentage.min(100.0) as u8
}

/// Applies completed-activity events to a child's progress
#[derive(Clone)]
pub struct ProgressEngine {
    clock: Arc<dyn Clock>,
}

impl ProgressEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Progress for a brand new child: all subjects at 0%, nothing earned
    pub fn create_initial_progress(&self, profile: &UserProfile) -> ChildProgress {
        ChildProgress {
            name: profile.name.clone(),
            age: profile.age,
            grade: profile.grade,
            avatar: profile.avatar.clone(),
            level: 1,
            total_stars: 0,
            daily_streak: 0,
            last_played_date: self.clock.today(),
            subjects: Subject::ALL.iter().map(|&s| SubjectProgress::new(s)).collect(),
            badges: badge_catalog(),
            completed_lessons: Vec::new(),
        }
    }

    /// Advance the daily streak to today.
    ///
    /// A last-played date in the future (clock skew) keeps the streak as is.
    pub fn update_streak(&self, progress: &ChildProgress) -> ChildProgress {
        let today = self.clock.today();
        let gap_days = (today - progress.last_played_date).num_days();

        let daily_streak = match gap_days {
            1 => progress.daily_streak.saturating_add(1),
            gap if gap > 1 => 1,
            gap => {
                if gap < 0 {
                    debug!(
                        "Last played date {} is after today {}, keeping streak of {}",
                        progress.last_played_date, today, progress.daily_streak
                    );
                }
                progress.daily_streak
            }
        };

        ChildProgress {
            daily_streak,
            last_played_date: today,
            ..progress.clone()
        }
    }

    /// Add stars and recompute the level
    pub fn add_stars(&self, progress: &ChildProgress, stars: u32) -> ChildProgress {
        let total_stars = progress.total_stars.saturating_add(stars);
        ChildProgress {
            total_stars,
            level: level_for_stars(total_stars),
            ..progress.clone()
        }
    }

    /// Record a lesson as completed. Duplicate lesson ids are ignored.
    ///
    /// An unknown `subject_id` still records the lesson id but touches no subject.
    pub fn complete_lesson(&self, progress: &ChildProgress, subject_id: &str, lesson_id: &str) -> ChildProgress {
        if progress.completed_lessons.iter().any(|id| id == lesson_id) {
            debug!("Lesson {} already completed, ignoring", lesson_id);
            return progress.clone();
        }

        let mut completed_lessons = progress.completed_lessons.clone();
        completed_lessons.push(lesson_id.to_string());

        let subjects = progress
            .subjects
            .iter()
            .map(|subject| {
                if subject.id != subject_id {
                    return subject.clone();
                }
                let completed = subject.completed_lessons.saturating_add(1);
                SubjectProgress {
                    completed_lessons: completed,
                    progress: subject_percentage(completed, subject.total_lessons),
                    ..subject.clone()
                }
            })
            .collect();

        ChildProgress {
            subjects,
            completed_lessons,
            ..progress.clone()
        }
    }

    /// Evaluate every automatic badge rule against the snapshot
    pub fn check_and_award_badges(&self, progress: &ChildProgress) -> ChildProgress {
        BADGE_RULES
            .iter()
            .filter(|rule| rule.criterion.is_met(progress))
            .fold(progress.clone(), |updated, rule| self.award_badge(&updated, rule.badge_id))
    }

    /// Mark a badge earned now, unless it already is. Unknown ids are ignored.
    pub fn award_badge(&self, progress: &ChildProgress, badge_id: u8) -> ChildProgress {
        if !progress.badges.iter().any(|b| b.id == badge_id && !b.earned) {
            return progress.clone();
        }

        let earned_at = self.clock.now();
        let mut updated = progress.clone();
        for badge in updated.badges.iter_mut().filter(|b| b.id == badge_id) {
            badge.earned = true;
            badge.earned_date = Some(earned_at);
        }
        debug!("Awarded badge {} to {}", badge_id, updated.name);
        updated
    }

    /// Team Player, earned by joining any multiplayer activity
    pub fn award_team_player_badge(&self, progress: &ChildProgress) -> ChildProgress {
        self.award_badge(progress, TEAM_PLAYER)
    }
}
