//! Reporting ingest: the alternate finalize path for matches resolved
//! outside this process (multi-round tournaments, games without a live
//! move-submission phase).
//!
//! Never touches the move buffer or the live session state machine.

use derive_getters::Getters;
use derive_new::new;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::GameError;
use crate::db::{GameRepository, MatchEntry, MatchOutcome, NewGameRoom, NewUser};

/// One player's line in an externally-resolved match report.
#[derive(Debug, Clone, new, Getters)]
pub struct PlayerReport {
    /// The player's external platform id.
    external_id: i64,
    /// The outcome from this player's perspective.
    result: MatchOutcome,
    /// The score to credit.
    score: i32,
}

/// A complete externally-resolved match report.
#[derive(Debug, Clone, new, Getters)]
pub struct MatchReport {
    /// Game type name; created if missing.
    game_type: String,
    /// Room code; created if missing.
    room_code: String,
    /// Optional match duration in seconds.
    duration_seconds: Option<i32>,
    /// Two or more player results.
    players: Vec<PlayerReport>,
}

/// Service layer for recording externally-resolved matches.
#[derive(Debug, Clone)]
pub struct ReportService {
    repository: GameRepository,
}

impl ReportService {
    /// Creates a new report service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: GameRepository) -> Self {
        info!("Creating ReportService");
        Self { repository }
    }

    /// Records a finished-match report.
    ///
    /// Game type, room, and every listed user are ensured with independent
    /// idempotent upserts, then all match records (sharing one match id) and
    /// leaderboard upserts commit together. Returns the match id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientMoves`] for a report with fewer than
    /// two players, or [`GameError::Storage`] on database failure.
    #[instrument(skip(self, report), fields(game_type = %report.game_type(), room = %report.room_code()))]
    pub fn record(&self, report: &MatchReport) -> Result<String, GameError> {
        if report.players().len() < 2 {
            return Err(GameError::InsufficientMoves {
                code: report.room_code().clone(),
                have: report.players().len(),
            });
        }

        let game_type = self.repository.ensure_game_type(report.game_type(), None)?;

        let room = match self.repository.find_room(report.room_code())? {
            Some(room) => room,
            None => self.repository.create_room(NewGameRoom::new(
                report.room_code().clone(),
                *game_type.id(),
            ))?,
        };

        let mut entries = Vec::with_capacity(report.players().len());
        for player in report.players() {
            let user = match self.repository.find_user(*player.external_id())? {
                Some(user) => user,
                None => self.repository.create_user(NewUser::new(
                    *player.external_id(),
                    "unknown".to_string(),
                ))?,
            };
            entries.push(MatchEntry::new(*user.id(), *player.result(), *player.score()));
        }

        let match_id = Uuid::new_v4().to_string();
        self.repository.record_report(
            *room.id(),
            *game_type.id(),
            &match_id,
            *report.duration_seconds(),
            &entries,
        )?;

        info!(
            match_id = %match_id,
            players = entries.len(),
            "External match report recorded"
        );
        Ok(match_id)
    }
}
