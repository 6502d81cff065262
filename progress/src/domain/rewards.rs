//! Star calculators and level read models shown on the reward screen.

use serde::{Deserialize, Serialize};
use shared::{Battle, ChildProgress};

use super::progress_engine::STARS_PER_LEVEL;

pub const BATTLE_WIN_STARS: u32 = 100;
pub const BATTLE_LOSS_STARS: u32 = 50;

fn percent_correct(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(correct.min(total)) / f64::from(total) * 100.0
}

/// 0-3 stars for a solo lesson
pub fn lesson_stars(correct: u32, total: u32) -> u32 {
    let pct = percent_correct(correct, total);
    if pct >= 90.0 {
        3
    } else if pct >= 70.0 {
        2
    } else if pct >= 50.0 {
        1
    } else {
        0
    }
}

/// Stars for a finished battle
pub fn battle_stars(won: bool) -> u32 {
    if won {
        BATTLE_WIN_STARS
    } else {
        BATTLE_LOSS_STARS
    }
}

/// Stars for a finished study session; everyone who takes part gets at least 20
pub fn study_session_stars(correct: u32, total: u32) -> u32 {
    let pct = percent_correct(correct, total);
    if total > 0 && correct >= total {
        100
    } else if pct >= 80.0 {
        80
    } else if pct >= 60.0 {
        60
    } else if pct >= 40.0 {
        40
    } else {
        20
    }
}

/// True when `user_id` strictly out-scored every other player
pub fn did_win(battle: &Battle, user_id: &str) -> bool {
    if let Some(winner) = &battle.winner_id {
        return winner == user_id;
    }
    let Some(me) = battle.player(user_id) else {
        return false;
    };
    battle
        .players
        .iter()
        .filter(|p| p.user_id != user_id)
        .all(|opponent| me.score > opponent.score)
}

/// Where the child stands inside the current level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub stars_into_level: u32,
    pub stars_to_next_level: u32,
}

pub fn level_progress(progress: &ChildProgress) -> LevelProgress {
    let stars_into_level = progress.total_stars % STARS_PER_LEVEL;
    LevelProgress {
        level: progress.level,
        stars_into_level,
        stars_to_next_level: STARS_PER_LEVEL - stars_into_level,
    }
}
