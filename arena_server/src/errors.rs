use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::protocol::{ErrorReason, ServerMessage};

/// Unified error types for the arena
#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("User {user_id} not found")]
    UserNotFound { user_id: String },

    #[error("Insufficient balance: has {balance}, needs {required}")]
    InsufficientBalance { balance: u64, required: u64 },

    #[error("Room {room_id} is full")]
    RoomFull { room_id: String },

    #[error("Avatar {avatar} not owned by user {user_id}")]
    AvatarNotFound { user_id: String, avatar: String },

    #[error("Invalid target: {reason}")]
    InvalidTarget { reason: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: u64 },

    #[error("Ledger update for {user_id} kept conflicting, gave up after retries")]
    LedgerContention { user_id: String },

    #[error("Persistence operation failed: {message}")]
    PersistenceFailure { message: String },

    #[error("Internal error: {message}")]
    SystemError { message: String },
}

/// Result type alias for arena operations
pub type ArenaResult<T> = Result<T, ArenaError>;

impl ArenaError {
    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::UserNotFound {
            user_id: user_id.into(),
        }
    }

    pub fn room_full(room_id: impl Into<String>) -> Self {
        Self::RoomFull {
            room_id: room_id.into(),
        }
    }

    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailure {
            message: message.into(),
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::SystemError {
            message: message.into(),
        }
    }

    /// 사용자에게 직접 알려도 되는 에러인지 여부. 나머지는 SystemError 로 감춘다.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. }
                | Self::InsufficientBalance { .. }
                | Self::RoomFull { .. }
                | Self::AvatarNotFound { .. }
                | Self::InvalidTarget { .. }
                | Self::InvalidAmount { .. }
        )
    }

    pub fn reason(&self) -> ErrorReason {
        match self {
            Self::UserNotFound { .. } => ErrorReason::UserNotFound,
            Self::InsufficientBalance { .. } => ErrorReason::InsufficientBalance,
            Self::RoomFull { .. } => ErrorReason::RoomFull,
            Self::AvatarNotFound { .. } | Self::InvalidTarget { .. } | Self::InvalidAmount { .. } => {
                ErrorReason::InvalidRequest
            }
            Self::LedgerContention { .. }
            | Self::PersistenceFailure { .. }
            | Self::SystemError { .. } => ErrorReason::SystemError,
        }
    }
}

impl From<redis::RedisError> for ArenaError {
    fn from(e: redis::RedisError) -> Self {
        ArenaError::persistence(e.to_string())
    }
}

impl From<serde_json::Error> for ArenaError {
    fn from(e: serde_json::Error) -> Self {
        ArenaError::persistence(format!("record (de)serialization failed: {}", e))
    }
}

impl From<actix::MailboxError> for ArenaError {
    fn from(e: actix::MailboxError) -> Self {
        ArenaError::system(e.to_string())
    }
}

/// Convert ArenaError to the error event sent over the websocket
impl From<&ArenaError> for ServerMessage {
    fn from(error: &ArenaError) -> Self {
        ServerMessage::Error {
            reason: error.reason(),
        }
    }
}

impl ResponseError for ArenaError {
    fn status_code(&self) -> StatusCode {
        match self {
            ArenaError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            ArenaError::InsufficientBalance { .. }
            | ArenaError::AvatarNotFound { .. }
            | ArenaError::InvalidTarget { .. }
            | ArenaError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
            ArenaError::RoomFull { .. } => StatusCode::CONFLICT,
            ArenaError::LedgerContention { .. }
            | ArenaError::PersistenceFailure { .. }
            | ArenaError::SystemError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // 5xx 는 내부 내용을 노출하지 않는다.
        let message = if self.is_user_facing() {
            self.to_string()
        } else {
            tracing::error!("{}", self);
            "An internal server error occurred.".to_string()
        };

        HttpResponse::build(status).json(json!({
            "error": message,
            "reason": self.reason(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_failures_surface_as_system_error() {
        let errors = [
            ArenaError::persistence("redis down"),
            ArenaError::LedgerContention {
                user_id: "u1".into(),
            },
            ArenaError::system("boom"),
        ];
        for error in errors {
            assert_eq!(error.reason(), ErrorReason::SystemError);
            assert!(!error.is_user_facing());
            assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn user_facing_errors_keep_their_reason() {
        let err = ArenaError::InsufficientBalance {
            balance: 20,
            required: 25,
        };
        assert_eq!(err.reason(), ErrorReason::InsufficientBalance);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        assert_eq!(ArenaError::user_not_found("x").reason(), ErrorReason::UserNotFound);
        assert_eq!(ArenaError::room_full("r").status_code(), StatusCode::CONFLICT);
    }
}
