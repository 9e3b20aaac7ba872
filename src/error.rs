//! Caller-facing error kinds for the match-session core.
//!
//! Every failure the core can produce maps to one of these variants, so a
//! transport shell can translate kinds to distinct caller-visible outcomes.

use derive_more::{Display, Error};

use crate::db::DbError;

/// Errors surfaced by the match-session core.
///
/// All variants are recoverable by the caller. Validation kinds are detected
/// before any mutation; [`GameError::PlayerNotRegistered`] and
/// [`GameError::Storage`] roll back atomically, leaving persisted state and
/// the move buffer unchanged so a retry after remediation is safe.
#[derive(Debug, Clone, Display, Error)]
pub enum GameError {
    /// A submitted move is outside the valid choice set.
    #[display("Invalid choice: '{}'", choice)]
    InvalidChoice {
        /// The offending move string.
        choice: String,
    },
    /// No room exists with the given code.
    #[display("Room '{}' not found", code)]
    RoomNotFound {
        /// The room code looked up.
        code: String,
    },
    /// The room exists but has already been finalized.
    #[display("Room '{}' is not active", code)]
    RoomInactive {
        /// The room code looked up.
        code: String,
    },
    /// Fewer than two moves are buffered for the room.
    #[display("Not enough moves for room '{}' ({} buffered)", code, have)]
    InsufficientMoves {
        /// The room code.
        code: String,
        /// Number of moves currently buffered.
        have: usize,
    },
    /// A referenced player has no identity record.
    #[display("Player {} is not registered", external_id)]
    PlayerNotRegistered {
        /// The player's external platform id.
        external_id: i64,
    },
    /// No game type exists with the given name.
    #[display("Game type '{}' not found", name)]
    GameTypeNotFound {
        /// The game type name looked up.
        name: String,
    },
    /// A storage operation or commit failed; all effects were rolled back.
    #[display("Storage commit failure: {}", _0)]
    Storage(#[error(source)] DbError),
}

impl From<DbError> for GameError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        Self::Storage(err)
    }
}

// Required so GameError can thread through diesel transaction closures.
impl From<diesel::result::Error> for GameError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::Storage(DbError::from(err))
    }
}
