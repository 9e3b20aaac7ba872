//! Match session orchestration: room lifecycle, move collection, winner
//! determination, and exactly-once commit of results.
//!
//! Per room the conceptual state machine is `CREATED → MOVES_PENDING →
//! MOVES_COMPLETE → FINALIZING → FINALIZED`. `FINALIZED` is terminal and is
//! materialized as the room's `is_active` flag flipping false inside the
//! finalize transaction, which is what makes concurrent finalizes resolve to
//! exactly one winner.

use derive_getters::Getters;
use rand::Rng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::{GameRepository, MatchEntry, MatchOutcome, NewGameRoom, User};
use crate::moves::MoveBuffer;
use crate::rules::{self, RoundResult};
use crate::GameError;

/// Length of generated room codes.
const ROOM_CODE_LEN: usize = 6;

/// Alphabet for generated room codes.
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Progress of move collection for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveStatus {
    /// Fewer than two distinct players have moved.
    Waiting {
        /// Distinct players who have moved so far.
        count: usize,
    },
    /// Two (or more) players have moved; the room is ready to finalize.
    Ready {
        /// External ids of the players who have moved, in submission order.
        players: Vec<i64>,
    },
}

/// One player's share of a finalized match.
#[derive(Debug, Clone, Getters)]
pub struct PlayerOutcome {
    /// The player's external platform id.
    external_id: i64,
    /// The player's display name at finalize time.
    display_name: String,
    /// The move the player submitted.
    choice: String,
    /// The outcome from this player's perspective.
    outcome: MatchOutcome,
    /// The score credited for the outcome.
    score: i32,
}

/// Result of a successful finalize: the committed match, per player.
#[derive(Debug, Clone, Getters)]
pub struct MatchSummary {
    /// Identifier shared by all match records of this match.
    match_id: String,
    /// Code of the room the match was played in.
    room_code: String,
    /// Both players' outcomes, in slot order.
    players: Vec<PlayerOutcome>,
}

/// Orchestrates room validation, move collection, rule evaluation, and the
/// atomic application of match results.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    repository: GameRepository,
    moves: MoveBuffer,
}

impl SessionResolver {
    /// Creates a resolver over the given repository and move buffer.
    #[instrument(skip(repository, moves))]
    pub fn new(repository: GameRepository, moves: MoveBuffer) -> Self {
        info!("Creating SessionResolver");
        Self { repository, moves }
    }

    /// Returns the shared move buffer.
    #[instrument(skip(self))]
    pub fn moves(&self) -> &MoveBuffer {
        &self.moves
    }

    /// Creates a new active room for the given game type.
    ///
    /// Inactive rooms are garbage-collected first (best effort), then a
    /// random 6-character code is generated and re-generated until it does
    /// not collide with an existing room.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameTypeNotFound`] for an unknown game type,
    /// [`GameError::PlayerNotRegistered`] for an unknown requester, or
    /// [`GameError::Storage`] on database failure.
    #[instrument(skip(self))]
    pub fn create_room(&self, game_type: &str, requester: i64) -> Result<String, GameError> {
        let game_type = self
            .repository
            .find_game_type(game_type)?
            .ok_or_else(|| GameError::GameTypeNotFound {
                name: game_type.to_string(),
            })?;

        self.repository
            .find_user(requester)?
            .ok_or(GameError::PlayerNotRegistered {
                external_id: requester,
            })?;

        // Best-effort cleanup; room creation proceeds even if it fails.
        if let Err(e) = self.repository.delete_inactive_rooms() {
            warn!(error = %e, "Inactive room cleanup failed");
        }

        // The existence check is advisory; the code's unique constraint
        // decides. Losing an insert race to a concurrent creator just sends
        // us back around the loop.
        let room = loop {
            let candidate = generate_room_code();
            if self.repository.find_room(&candidate)?.is_some() {
                debug!(code = %candidate, "Room code collision, regenerating");
                continue;
            }
            match self
                .repository
                .try_create_room(NewGameRoom::new(candidate, *game_type.id()))?
            {
                Some(room) => break room,
                None => debug!("Lost room code race, regenerating"),
            }
        };

        info!(code = %room.code(), game_type = %game_type.name(), "Room created");
        Ok(room.code().clone())
    }

    /// Records a player's move for an active room.
    ///
    /// Choice validity is checked by the rule engine at finalize time, so a
    /// player may overwrite a bad move before the session ends. A submission
    /// that races a concurrent finalize is rejected with
    /// [`GameError::RoomInactive`] and its buffer entry purged.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomNotFound`] or [`GameError::RoomInactive`] if
    /// the room cannot accept moves, or [`GameError::Storage`] on database
    /// failure.
    #[instrument(skip(self))]
    pub fn register_move(
        &self,
        room_code: &str,
        player: i64,
        choice: &str,
    ) -> Result<MoveStatus, GameError> {
        self.open_room(room_code)?;

        let count = self.moves.submit(room_code, player, choice);

        // The room check and the buffer insert are not atomic: a concurrent
        // finalize can commit and purge the buffer in between, leaving this
        // entry attached to a terminal room. Re-check so the buffer only
        // ever holds moves for active rooms and a recycled code never
        // inherits stale ones.
        self.open_room(room_code)?;

        if count < 2 {
            debug!(room_code, player, "Waiting for opponent");
            return Ok(MoveStatus::Waiting { count });
        }

        let players = self
            .moves
            .peek(room_code)
            .unwrap_or_default()
            .iter()
            .map(|m| *m.player())
            .collect();
        info!(room_code, "Room ready to finalize");
        Ok(MoveStatus::Ready { players })
    }

    /// Resolves and commits the match played in a room, exactly once.
    ///
    /// The first two buffered moves in submission order become player 1 and
    /// player 2; any excess submission is ignored. All persistent effects
    /// (two match records, two leaderboard upserts, room deactivation) commit
    /// in one transaction; the buffer entry is purged only after commit.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomNotFound`] / [`GameError::RoomInactive`] on
    /// room validation, [`GameError::InsufficientMoves`] with fewer than two
    /// buffered moves, [`GameError::InvalidChoice`] if a buffered move fails
    /// rule validation, or [`GameError::PlayerNotRegistered`] /
    /// [`GameError::Storage`] after computation. Every failure leaves the
    /// room active and the buffer intact, so the caller may remediate and
    /// retry.
    #[instrument(skip(self))]
    pub fn finalize(&self, room_code: &str) -> Result<MatchSummary, GameError> {
        let room = self.active_room(room_code)?;

        let moves = self.moves.peek(room_code).unwrap_or_default();
        if moves.len() < 2 {
            // A racing finalize may have committed and purged the buffer
            // between our room check and this peek; report the room state,
            // not the empty buffer.
            self.active_room(room_code)?;
            warn!(room_code, have = moves.len(), "Not enough moves to finalize");
            return Err(GameError::InsufficientMoves {
                code: room_code.to_string(),
                have: moves.len(),
            });
        }

        // Slot assignment: first two entries in submission order.
        let (first, second) = (&moves[0], &moves[1]);
        if moves.len() > 2 {
            warn!(room_code, excess = moves.len() - 2, "Ignoring excess submissions");
        }

        let result = rules::play(first.choice(), second.choice())?;

        let user1 = self.registered_user(*first.player())?;
        let user2 = self.registered_user(*second.player())?;

        let (outcome1, outcome2) = match result {
            RoundResult::Draw => (MatchOutcome::Draw, MatchOutcome::Draw),
            RoundResult::Player1 => (MatchOutcome::Win, MatchOutcome::Loss),
            RoundResult::Player2 => (MatchOutcome::Loss, MatchOutcome::Win),
        };

        let match_id = Uuid::new_v4().to_string();
        let entries = [
            MatchEntry::new(*user1.id(), outcome1, outcome1.score()),
            MatchEntry::new(*user2.id(), outcome2, outcome2.score()),
        ];

        self.repository.finalize_match(&room, &match_id, &entries)?;

        // Commit succeeded; the room is now terminal and its buffered moves
        // can be dropped.
        self.moves.clear(room_code);

        let summary = MatchSummary {
            match_id,
            room_code: room_code.to_string(),
            players: vec![
                player_outcome(&user1, first.choice(), outcome1),
                player_outcome(&user2, second.choice(), outcome2),
            ],
        };

        info!(
            room_code,
            match_id = %summary.match_id(),
            result = ?result,
            "Match finalized"
        );
        Ok(summary)
    }

    /// Like [`Self::active_room`], but also purges the room's buffered moves
    /// when the room turns out to be terminal (inactive or deleted).
    #[instrument(skip(self))]
    fn open_room(&self, room_code: &str) -> Result<crate::db::GameRoom, GameError> {
        match self.active_room(room_code) {
            Ok(room) => Ok(room),
            Err(e @ (GameError::RoomNotFound { .. } | GameError::RoomInactive { .. })) => {
                self.moves.clear(room_code);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Loads a room and verifies it can still accept session operations.
    #[instrument(skip(self))]
    fn active_room(&self, room_code: &str) -> Result<crate::db::GameRoom, GameError> {
        let room = self
            .repository
            .find_room(room_code)?
            .ok_or_else(|| GameError::RoomNotFound {
                code: room_code.to_string(),
            })?;

        if !room.is_active() {
            warn!(room_code, "Room is not active");
            return Err(GameError::RoomInactive {
                code: room_code.to_string(),
            });
        }

        Ok(room)
    }

    /// Resolves a buffered player to an identity record.
    #[instrument(skip(self))]
    fn registered_user(&self, external_id: i64) -> Result<User, GameError> {
        self.repository
            .find_user(external_id)?
            .ok_or(GameError::PlayerNotRegistered { external_id })
    }
}

/// Builds one player's slice of a match summary.
fn player_outcome(user: &User, choice: &str, outcome: MatchOutcome) -> PlayerOutcome {
    PlayerOutcome {
        external_id: *user.external_id(),
        display_name: user.display_name().clone(),
        choice: choice.to_string(),
        outcome,
        score: outcome.score(),
    }
}

/// Generates a random 6-character uppercase alphanumeric room code.
fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARS[rng.gen_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}
