//! Badge catalog and automatic award rules.

use shared::{Badge, ChildProgress, Rarity, Subject};

pub const FIRST_STEPS: u8 = 1;
pub const MATH_BEGINNER: u8 = 2;
pub const MATH_WHIZ: u8 = 3;
pub const MATH_MASTER: u8 = 4;
pub const STREAK_3_DAYS: u8 = 8;
pub const STREAK_5_DAYS: u8 = 9;
pub const STREAK_10_DAYS: u8 = 10;
pub const TEAM_PLAYER: u8 = 16;
pub const STAR_COLLECTOR: u8 = 17;
pub const LEVEL_5: u8 = 18;
pub const LEVEL_10: u8 = 19;

/// (id, name, icon, rarity) for every badge a child can earn
const CATALOG: [(u8, &str, &str, Rarity); 19] = [
    (1, "First Steps", "👣", Rarity::Bronze),
    (2, "Math Beginner", "🧮", Rarity::Bronze),
    (3, "Math Whiz", "🔢", Rarity::Silver),
    (4, "Math Master", "➗", Rarity::Gold),
    (5, "Book Worm", "📚", Rarity::Silver),
    (6, "Science Star", "🔬", Rarity::Silver),
    (7, "Art Expert", "🎨", Rarity::Silver),
    (8, "3 Day Streak", "🔥", Rarity::Bronze),
    (9, "5 Day Streak", "⚡", Rarity::Silver),
    (10, "10 Day Streak", "💥", Rarity::Gold),
    (11, "Speed Demon", "⚡", Rarity::Bronze),
    (12, "Brain Champion", "🧠", Rarity::Gold),
    (13, "Music Maestro", "🎵", Rarity::Silver),
    (14, "Perfect Score", "💯", Rarity::Gold),
    (15, "Explorer", "🗺️", Rarity::Bronze),
    (16, "Team Player", "🤝", Rarity::Silver),
    (17, "Star Collector", "⭐", Rarity::Silver),
    (18, "Level 5", "🏆", Rarity::Bronze),
    (19, "Level 10", "👑", Rarity::Gold),
];

/// The full catalog with nothing earned, in id order
pub fn badge_catalog() -> Vec<Badge> {
    CATALOG
        .iter()
        .map(|&(id, name, icon, rarity)| Badge {
            id,
            name: name.to_string(),
            icon: icon.to_string(),
            rarity,
            earned: false,
            earned_date: None,
        })
        .collect()
}

/// Condition under which a badge is awarded automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCriterion {
    /// Exactly this many distinct lessons completed
    LessonsCompleted(usize),
    /// At least this many lessons completed in one subject
    SubjectLessons { subject: Subject, at_least: u32 },
    StreakAtLeast(u32),
    StarsAtLeast(u32),
    LevelAtLeast(u32),
}

impl BadgeCriterion {
    pub fn is_met(&self, progress: &ChildProgress) -> bool {
        match *self {
            BadgeCriterion::LessonsCompleted(count) => progress.completed_lessons.len() == count,
            BadgeCriterion::SubjectLessons { subject, at_least } => progress
                .subject(subject)
                .map(|s| s.completed_lessons >= at_least)
                .unwrap_or(false),
            BadgeCriterion::StreakAtLeast(days) => progress.daily_streak >= days,
            BadgeCriterion::StarsAtLeast(stars) => progress.total_stars >= stars,
            BadgeCriterion::LevelAtLeast(level) => progress.level >= level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeRule {
    pub badge_id: u8,
    pub criterion: BadgeCriterion,
}

/// Automatic rules, all evaluated on every check
pub const BADGE_RULES: [BadgeRule; 10] = [
    BadgeRule { badge_id: FIRST_STEPS, criterion: BadgeCriterion::LessonsCompleted(1) },
    BadgeRule {
        badge_id: MATH_BEGINNER,
        criterion: BadgeCriterion::SubjectLessons { subject: Subject::Math, at_least: 3 },
    },
    BadgeRule {
        badge_id: MATH_WHIZ,
        criterion: BadgeCriterion::SubjectLessons { subject: Subject::Math, at_least: 10 },
    },
    BadgeRule {
        badge_id: MATH_MASTER,
        criterion: BadgeCriterion::SubjectLessons { subject: Subject::Math, at_least: 20 },
    },
    BadgeRule { badge_id: STREAK_3_DAYS, criterion: BadgeCriterion::StreakAtLeast(3) },
    BadgeRule { badge_id: STREAK_5_DAYS, criterion: BadgeCriterion::StreakAtLeast(5) },
    BadgeRule { badge_id: STREAK_10_DAYS, criterion: BadgeCriterion::StreakAtLeast(10) },
    BadgeRule { badge_id: STAR_COLLECTOR, criterion: BadgeCriterion::StarsAtLeast(100) },
    BadgeRule { badge_id: LEVEL_5, criterion: BadgeCriterion::LevelAtLeast(5) },
    BadgeRule { badge_id: LEVEL_10, criterion: BadgeCriterion::LevelAtLeast(10) },
];

/// Badges earned in `new` that were not earned in `old`
pub fn newly_earned_badges(old: &ChildProgress, new: &ChildProgress) -> Vec<Badge> {
    new.badges
        .iter()
        .filter(|badge| badge.earned && !old.has_badge(badge.id))
        .cloned()
        .collect()
}
