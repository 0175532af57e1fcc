//! Error handling module
//!
//! Defines custom error types for the town server.
//!
//! Follower chain rejections are not errors: they are reported through
//! [`FollowerOutcome`](crate::game::followers::FollowerOutcome).

use std::io;

use thiserror::Error;

/// Main error type for the town server
#[derive(Error, Debug)]
pub enum TownServerError {
    /// Town/session logic errors
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Town and session errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Invalid session token")]
    InvalidSession,

    #[error("Town is full (capacity {capacity})")]
    TownFull { capacity: usize },

    #[error("Town not found: {0}")]
    TownNotFound(String),

    #[error("Invalid town update password")]
    InvalidPassword,

    #[error("Invalid area: {0}")]
    InvalidArea(String),
}

/// Result type alias for town server operations
pub type Result<T> = std::result::Result<T, TownServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GameError::TownFull { capacity: 50 };
        assert_eq!(err.to_string(), "Town is full (capacity 50)");

        let err = GameError::InvalidArea("label already in use".to_string());
        assert_eq!(err.to_string(), "Invalid area: label already in use");

        let err: TownServerError = GameError::InvalidSession.into();
        assert_eq!(err.to_string(), "Game error: Invalid session token");

        let err = TownServerError::Config("Town capacity must be between 1 and 10000".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: Town capacity must be between 1 and 10000"
        );
    }
}
