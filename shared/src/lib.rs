use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;

// ========= SUBJECTS & PROGRESS =========

/// One of the five fixed learning categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Reading,
    Science,
    Art,
    Music,
}

impl Subject {
    /// All subjects in catalog order
    pub const ALL: [Subject; 5] = [
        Subject::Math,
        Subject::Reading,
        Subject::Science,
        Subject::Art,
        Subject::Music,
    ];

    /// Stable identifier used in lesson ids and persisted progress
    pub fn id(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Reading => "reading",
            Subject::Science => "science",
            Subject::Art => "art",
            Subject::Music => "music",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Subject::Math => "Math",
            Subject::Reading => "Reading",
            Subject::Science => "Science",
            Subject::Art => "Art",
            Subject::Music => "Music",
        }
    }

    /// Number of lessons that make up 100% of the subject
    pub fn total_lessons(&self) -> u32 {
        match self {
            Subject::Math | Subject::Reading | Subject::Science => 20,
            Subject::Art | Subject::Music => 15,
        }
    }

    pub fn from_id(id: &str) -> Option<Subject> {
        Subject::ALL.iter().copied().find(|s| s.id() == id)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Completion tracking for a single subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub id: String,
    pub name: String,
    /// 0-100, derived from completed_lessons / total_lessons
    pub progress: u8,
    pub completed_lessons: u32,
    pub total_lessons: u32,
}

impl SubjectProgress {
    /// Fresh, zeroed progress for a subject
    pub fn new(subject: Subject) -> Self {
        Self {
            id: subject.id().to_string(),
            name: subject.display_name().to_string(),
            progress: 0,
            completed_lessons: 0,
            total_lessons: subject.total_lessons(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Bronze,
    Silver,
    Gold,
}

/// A permanent, one-time achievement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: u8,
    pub name: String,
    pub icon: String,
    pub rarity: Rarity,
    pub earned: bool,
    /// Set once when the badge is earned, never overwritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_date: Option<DateTime<Utc>>,
}

/// Identity captured at signup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub age: u8,
    pub grade: u8,
    pub avatar: String,
}

/// Cumulative progress of one child on one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProgress {
    pub name: String,
    pub age: u8,
    pub grade: u8,
    pub avatar: String,
    /// Always floor(total_stars / 100) + 1
    pub level: u32,
    pub total_stars: u32,
    pub daily_streak: u32,
    pub last_played_date: NaiveDate,
    pub subjects: Vec<SubjectProgress>,
    pub badges: Vec<Badge>,
    /// Lesson ids, no duplicates
    pub completed_lessons: Vec<String>,
}

impl ChildProgress {
    pub fn subject(&self, subject: Subject) -> Option<&SubjectProgress> {
        self.subjects.iter().find(|s| s.id == subject.id())
    }

    pub fn badge(&self, badge_id: u8) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == badge_id)
    }

    pub fn has_badge(&self, badge_id: u8) -> bool {
        self.badge(badge_id).map(|b| b.earned).unwrap_or(false)
    }

    pub fn earned_badges(&self) -> impl Iterator<Item = &Badge> {
        self.badges.iter().filter(|b| b.earned)
    }
}

// ========= MULTIPLAYER ENTITIES =========

/// Presence records older than this are considered offline
pub const PRESENCE_TTL_MS: i64 = 5 * 60 * 1000;
/// Battles older than this are hidden from listings
pub const BATTLE_TTL_MS: i64 = 30 * 60 * 1000;
/// Study sessions older than this are hidden from listings
pub const STUDY_SESSION_TTL_MS: i64 = 60 * 60 * 1000;
/// Active battles and sessions nobody completed are dropped after this long
pub const ABANDONED_AFTER_MS: i64 = 24 * 60 * 60 * 1000;

pub const MAX_BATTLE_PLAYERS: usize = 2;
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 4;
pub const MIN_MAX_PARTICIPANTS: u32 = 2;
pub const MAX_MAX_PARTICIPANTS: u32 = 10;

/// Client polling cadence. The server never pushes.
pub mod polling {
    use std::time::Duration;

    pub const PRESENCE_HEARTBEAT: Duration = Duration::from_secs(30);
    pub const COMMUNITY_REFRESH: Duration = Duration::from_secs(5);
    pub const BATTLE_STATE: Duration = Duration::from_secs(2);
    pub const STUDY_SESSION_STATE: Duration = Duration::from_secs(3);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

/// Battle lifecycle: waiting -> active -> completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Waiting,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlePlayer {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub score: u32,
    pub ready: bool,
    /// Number of answers accepted for this player
    #[serde(default)]
    pub answered: u32,
}

/// A 2-player quiz competition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    pub id: String,
    pub subject: Subject,
    pub difficulty: Difficulty,
    pub players: Vec<BattlePlayer>,
    pub status: BattleStatus,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    /// None while running, and on a tie
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
}

impl Battle {
    pub fn player(&self, user_id: &str) -> Option<&BattlePlayer> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn has_player(&self, user_id: &str) -> bool {
        self.player(user_id).is_some()
    }
}

/// Study session lifecycle: waiting -> active -> completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub name: String,
}

/// A multi-participant group study room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub host_id: String,
    pub host_name: String,
    pub subject: Subject,
    pub max_participants: u32,
    pub participants: Vec<Participant>,
    pub status: SessionStatus,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl StudySession {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }
}

/// Heartbeat-based "online now" signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub level: u32,
    /// Epoch milliseconds of the last heartbeat
    pub last_active: i64,
}

/// One directed friend edge, owned by the user who added it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub friend_id: String,
    pub name: String,
    pub avatar: String,
    pub added_at: i64,
}

/// Stored friend list for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendList {
    pub user_id: String,
    pub friends: Vec<Friend>,
}

// ========= REQUESTS =========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRequest {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudySessionRequest {
    pub host_id: String,
    pub host_name: String,
    pub subject: Subject,
    /// Defaults to 4 when omitted
    #[serde(default)]
    pub max_participants: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinStudySessionRequest {
    pub user_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStudySessionRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBattleRequest {
    pub host_id: String,
    pub host_name: String,
    pub host_avatar: String,
    pub subject: Subject,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinBattleRequest {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub user_id: String,
    pub correct: bool,
    /// Milliseconds the player took to answer
    pub response_time: u64,
    /// Zero-based question index; when present it must be the next one
    #[serde(default)]
    pub question_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFriendRequest {
    pub user_id: String,
    pub friend_id: String,
    pub friend_name: String,
    pub friend_avatar: String,
}

// ========= RESPONSES =========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<PresenceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySessionResponse {
    pub session: StudySession,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySessionListResponse {
    pub sessions: Vec<StudySession>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResponse {
    pub battle: Battle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleListResponse {
    pub battles: Vec<Battle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendListResponse {
    pub friends: Vec<Friend>,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ========= TIME =========

/// Source of "now" for every time-dependent rule
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date in UTC
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(now) }
    }

    /// Clock pinned to noon UTC on the given date
    pub fn on_date(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        Self::new(noon.and_utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
