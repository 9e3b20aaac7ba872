//! rps_arena - match-session service for chat-bot rock-paper-scissors.
//!
//! Coordinates short-lived two-player matches, persists outcomes, and
//! maintains per-user leaderboards.
//!
//! # Architecture
//!
//! - **Rules**: pure rock-paper-scissors rule engine
//! - **Moves**: process-local buffer of submitted moves per active room
//! - **Session**: room lifecycle and exactly-once match finalization
//! - **Identity / Leaderboard / Report**: identity upserts, stats queries,
//!   and the alternate ingest path for externally-resolved matches
//! - **Server**: thin axum shell, one route per core operation
//!
//! # Example
//!
//! ```no_run
//! use rps_arena::{GameRepository, MoveBuffer, SessionResolver};
//!
//! # fn example() -> Result<(), rps_arena::GameError> {
//! let repository = GameRepository::new("rps_arena.db".to_string())?;
//! let resolver = SessionResolver::new(repository, MoveBuffer::new());
//! let code = resolver.create_room("rps", 42)?;
//! resolver.register_move(&code, 42, "rock")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod db;
mod error;
mod identity;
mod leaderboard;
mod moves;
mod report;
mod rules;
mod server;
mod session;

// Crate-level exports - errors
pub use error::GameError;

// Crate-level exports - storage layer
pub use db::{
    DbError, GameRepository, GameRoom, GameType, LeaderboardEntry, MatchEntry, MatchOutcome,
    MatchRecord, NewGameRoom, NewGameType, NewUser, User, UserStats,
};

// Crate-level exports - rule engine
pub use rules::{Choice, RoundResult, play};

// Crate-level exports - move buffer
pub use moves::{BufferedMove, MoveBuffer};

// Crate-level exports - session resolution
pub use session::{MatchSummary, MoveStatus, PlayerOutcome, SessionResolver};

// Crate-level exports - services
pub use identity::IdentityService;
pub use leaderboard::{LeaderboardService, LeaderboardStanding};
pub use report::{MatchReport, PlayerReport, ReportService};

// Crate-level exports - HTTP shell
pub use server::{
    AppState, ApiError, CreateRoomRequest, GameTypeQuery, MoveRequest, ReportPlayerRequest,
    ReportRequest, SyncUserRequest, router,
};
