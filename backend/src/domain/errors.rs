use thiserror::Error;

/// Failures of the session coordinator operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{kind} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("Battle is full")]
    BattleFull,
    #[error("Battle already started")]
    AlreadyStarted,
    #[error("Session is full")]
    SessionFull,
    #[error("{0}")]
    InvalidTransition(String),
    #[error("Answer for question {submitted} is out of order, expected question {expected}")]
    AnswerOutOfOrder { expected: u32, submitted: u32 },
    #[error("{0}")]
    Validation(String),
    #[error("Too many concurrent updates to {0}, try again")]
    ConcurrentUpdate(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl SessionError {
    pub fn battle_not_found(id: &str) -> Self {
        SessionError::NotFound { kind: "Battle", id: id.to_string() }
    }

    pub fn session_not_found(id: &str) -> Self {
        SessionError::NotFound { kind: "Session", id: id.to_string() }
    }

    /// Stable machine-readable code for the error body
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound { .. } => "NOT_FOUND",
            SessionError::BattleFull => "BATTLE_FULL",
            SessionError::AlreadyStarted => "ALREADY_STARTED",
            SessionError::SessionFull => "SESSION_FULL",
            SessionError::InvalidTransition(_) => "INVALID_TRANSITION",
            SessionError::AnswerOutOfOrder { .. } => "ANSWER_OUT_OF_ORDER",
            SessionError::Validation(_) => "INVALID_INPUT",
            SessionError::ConcurrentUpdate(_) => "CONCURRENT_UPDATE",
            SessionError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Reject blank identifiers and names
pub fn require_non_empty(field: &str, value: &str) -> SessionResult<()> {
    if value.trim().is_empty() {
        return Err(SessionError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}
