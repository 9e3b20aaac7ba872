//! Leaderboard queries and per-user statistics.
//!
//! The write side of the aggregator (the transactional counter upserts) lives
//! with the storage layer so it can participate in finalize and report
//! commits; this module is the read side.

use derive_getters::Getters;
use tracing::{debug, info, instrument};

use crate::GameError;
use crate::db::{GameRepository, UserStats};

/// One leaderboard row joined with the player's identity.
#[derive(Debug, Clone, Getters)]
pub struct LeaderboardStanding {
    /// The player's external platform id.
    external_id: i64,
    /// The player's display name.
    display_name: String,
    /// Matches won.
    wins: i32,
    /// Matches lost.
    losses: i32,
    /// Matches drawn.
    draws: i32,
}

/// Service layer for leaderboard and statistics queries.
#[derive(Debug, Clone)]
pub struct LeaderboardService {
    repository: GameRepository,
}

impl LeaderboardService {
    /// Creates a new leaderboard service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: GameRepository) -> Self {
        info!("Creating LeaderboardService");
        Self { repository }
    }

    /// Returns the leaderboard for a game type, ordered by wins descending.
    ///
    /// An unknown game type yields an empty leaderboard rather than an
    /// error, since "no one has played it" and "it does not exist" look the
    /// same to a leaderboard reader.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Storage`] on database failure.
    #[instrument(skip(self))]
    pub fn query(&self, game_type: &str) -> Result<Vec<LeaderboardStanding>, GameError> {
        let Some(game_type) = self.repository.find_game_type(game_type)? else {
            debug!(game_type, "Unknown game type, empty leaderboard");
            return Ok(Vec::new());
        };

        let rows = self.repository.leaderboard_for(*game_type.id())?;

        Ok(rows
            .into_iter()
            .map(|(entry, user)| LeaderboardStanding {
                external_id: *user.external_id(),
                display_name: user.display_name().clone(),
                wins: *entry.wins(),
                losses: *entry.losses(),
                draws: *entry.draws(),
            })
            .collect())
    }

    /// Computes a user's statistics within one game type by scanning their
    /// match records in rooms of that type.
    ///
    /// A user with no matches gets zero counters and an average score of 0.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerNotRegistered`] for an unknown user,
    /// [`GameError::GameTypeNotFound`] for an unknown game type, or
    /// [`GameError::Storage`] on database failure.
    #[instrument(skip(self))]
    pub fn user_stats(&self, external_id: i64, game_type: &str) -> Result<UserStats, GameError> {
        let user = self
            .repository
            .find_user(external_id)?
            .ok_or(GameError::PlayerNotRegistered { external_id })?;

        let game_type = self
            .repository
            .find_game_type(game_type)?
            .ok_or_else(|| GameError::GameTypeNotFound {
                name: game_type.to_string(),
            })?;

        let records = self
            .repository
            .match_records_for(*user.id(), *game_type.id())?;

        Ok(UserStats::from_records(&records))
    }
}
