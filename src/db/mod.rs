//! Database persistence layer for identities, rooms, match records, and
//! leaderboards.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{
    GameRoom, GameType, LeaderboardEntry, MatchOutcome, MatchRecord, NewGameRoom, NewGameType,
    NewLeaderboardEntry, NewMatchRecord, NewUser, User, UserStats,
};
pub use repository::{GameRepository, MatchEntry};
