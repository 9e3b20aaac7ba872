//! Database models and domain types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::{instrument, warn};

use crate::db::{DbError, schema};

/// Player identity database model.
///
/// Keyed externally by the chat platform's numeric id; never deleted.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    external_id: i64,
    display_name: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable user model for first-sight registration.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    external_id: i64,
    display_name: String,
}

/// Game type catalog entry (e.g. "rps").
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::game_types)]
pub struct GameType {
    id: i32,
    name: String,
    description: Option<String>,
    created_at: NaiveDateTime,
}

/// Insertable game type model.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::game_types)]
pub struct NewGameType {
    name: String,
    description: Option<String>,
}

/// Match room database model.
///
/// The `is_active` flag is true from creation until exactly one finalize
/// succeeds; inactive rooms are eligible for garbage collection.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::game_rooms)]
#[diesel(belongs_to(GameType))]
pub struct GameRoom {
    id: i32,
    code: String,
    game_type_id: i32,
    is_active: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable room model. Rooms start active (schema default).
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::game_rooms)]
pub struct NewGameRoom {
    code: String,
    game_type_id: i32,
}

/// Immutable record of one player's participation in one finished match.
///
/// The two (or more) rows of a single match share a `match_id`.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::game_sessions)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(GameRoom, foreign_key = room_id))]
pub struct MatchRecord {
    id: i32,
    user_id: i32,
    room_id: Option<i32>,
    match_id: String,
    result: String,
    score: i32,
    duration_seconds: Option<i32>,
    played_at: NaiveDateTime,
}

impl MatchRecord {
    /// Parses the stored result string into a [`MatchOutcome`] enum.
    #[instrument(skip(self), fields(result = %self.result))]
    pub fn parse_outcome(&self) -> Result<MatchOutcome, DbError> {
        MatchOutcome::from_db_string(self.result())
    }
}

/// Insertable match record.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::game_sessions)]
pub struct NewMatchRecord {
    user_id: i32,
    room_id: Option<i32>,
    match_id: String,
    result: String,
    score: i32,
    duration_seconds: Option<i32>,
}

/// Aggregated win/loss/draw counters for one user within one game type.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::leaderboard_entries)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(GameType))]
pub struct LeaderboardEntry {
    id: i32,
    user_id: i32,
    game_type_id: i32,
    wins: i32,
    losses: i32,
    draws: i32,
}

/// Insertable leaderboard entry, zeroed counters.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::leaderboard_entries)]
pub struct NewLeaderboardEntry {
    user_id: i32,
    game_type_id: i32,
    wins: i32,
    losses: i32,
    draws: i32,
}

impl NewLeaderboardEntry {
    /// Creates a zeroed entry for the (user, game type) pair.
    #[instrument]
    pub fn zeroed(user_id: i32, game_type_id: i32) -> Self {
        Self::new(user_id, game_type_id, 0, 0, 0)
    }
}

/// Match outcome from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    /// Player won the match.
    Win,
    /// Player lost the match.
    Loss,
    /// Match ended in a draw.
    Draw,
}

impl MatchOutcome {
    /// Converts outcome to the string stored in the database.
    #[instrument]
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Draw => "draw",
        }
    }

    /// Parses outcome from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is not a valid outcome value.
    #[instrument(skip(s), fields(s = %s))]
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            "draw" => Ok(Self::Draw),
            _ => Err(DbError::new(format!("Invalid outcome: '{}'", s))),
        }
    }

    /// Score recorded alongside this outcome: 1 for a win, 0 otherwise.
    #[instrument]
    pub fn score(&self) -> i32 {
        match self {
            Self::Win => 1,
            Self::Loss | Self::Draw => 0,
        }
    }
}

/// Per-user statistics for one game type, derived from match records.
#[derive(Debug, Clone, Getters)]
pub struct UserStats {
    total_games: i32,
    wins: i32,
    losses: i32,
    draws: i32,
    average_score: f64,
}

impl UserStats {
    /// Computes statistics from a user's match records.
    ///
    /// The average score is 0 when no matches were played.
    #[instrument(skip(records), fields(count = records.len()))]
    pub fn from_records(records: &[MatchRecord]) -> Self {
        let mut wins = 0;
        let mut losses = 0;
        let mut draws = 0;
        let mut total_score = 0i64;

        for record in records {
            match record.result().as_str() {
                "win" => wins += 1,
                "loss" => losses += 1,
                "draw" => draws += 1,
                other => warn!(result = %other, record_id = record.id(), "Unknown result value"),
            }
            total_score += i64::from(*record.score());
        }

        let total_games = records.len() as i32;
        let average_score = if total_games == 0 {
            0.0
        } else {
            total_score as f64 / f64::from(total_games)
        };

        Self {
            total_games,
            wins,
            losses,
            draws,
            average_score,
        }
    }
}
