//! Database repository for identities, rooms, match records, and leaderboards.

use chrono::Utc;
use derive_getters::Getters;
use derive_new::new;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::{debug, info, instrument};

use crate::GameError;
use crate::db::{
    DbError, GameRoom, GameType, LeaderboardEntry, MatchOutcome, MatchRecord, NewGameRoom,
    NewGameType, NewLeaderboardEntry, NewMatchRecord, NewUser, User, schema,
};

/// One player's line item within a match commit: who, how it went, and the
/// score credited for it.
#[derive(Debug, Clone, Copy, new, Getters)]
pub struct MatchEntry {
    user_id: i32,
    outcome: MatchOutcome,
    score: i32,
}

/// Database repository for all persistent core entities.
#[derive(Debug, Clone)]
pub struct GameRepository {
    db_path: String,
}

impl GameRepository {
    /// Creates a new repository connected to the database at the given path.
    ///
    /// Use `":memory:"` for an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is invalid.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Creating GameRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    ///
    /// The busy timeout lets a writer wait for a concurrent transaction to
    /// commit instead of failing with a lock error.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))?;
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Finds a user by external platform id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn find_user(&self, external_id: i64) -> Result<Option<User>, DbError> {
        debug!(external_id, "Looking up user");
        let mut conn = self.connection()?;

        let user = schema::users::table
            .filter(schema::users::external_id.eq(external_id))
            .first::<User>(&mut conn)
            .optional()?;

        Ok(user)
    }

    /// Creates a new user identity record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the external id is already taken or a database
    /// error occurs.
    #[instrument(skip(self, new_user))]
    pub fn create_user(&self, new_user: NewUser) -> Result<User, DbError> {
        let mut conn = self.connection()?;

        let user = diesel::insert_into(schema::users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), external_id = user.external_id(), "User created");
        Ok(user)
    }

    /// Updates a user's display name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the user does not exist or a database error
    /// occurs.
    #[instrument(skip(self))]
    pub fn update_display_name(&self, user_id: i32, display_name: &str) -> Result<User, DbError> {
        debug!(user_id, display_name = %display_name, "Updating display name");
        let mut conn = self.connection()?;

        let user = diesel::update(schema::users::table.filter(schema::users::id.eq(user_id)))
            .set((
                schema::users::display_name.eq(display_name),
                schema::users::updated_at.eq(Utc::now().naive_utc()),
            ))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        Ok(user)
    }

    /// Lists all users, ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_users(&self) -> Result<Vec<User>, DbError> {
        let mut conn = self.connection()?;

        let users = schema::users::table
            .order(schema::users::created_at.asc())
            .load::<User>(&mut conn)?;

        info!(count = users.len(), "Users loaded");
        Ok(users)
    }

    /// Finds a game type by name. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn find_game_type(&self, name: &str) -> Result<Option<GameType>, DbError> {
        let mut conn = self.connection()?;

        let game_type = schema::game_types::table
            .filter(schema::game_types::name.eq(name))
            .first::<GameType>(&mut conn)
            .optional()?;

        Ok(game_type)
    }

    /// Finds a game type by name or creates it. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn ensure_game_type(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<GameType, DbError> {
        if let Some(existing) = self.find_game_type(name)? {
            debug!(game_type_id = existing.id(), "Game type already exists");
            return Ok(existing);
        }

        let mut conn = self.connection()?;
        let game_type = diesel::insert_into(schema::game_types::table)
            .values(&NewGameType::new(
                name.to_string(),
                description.map(str::to_string),
            ))
            .returning(GameType::as_returning())
            .get_result(&mut conn)?;

        info!(game_type_id = game_type.id(), name = %name, "Game type created");
        Ok(game_type)
    }

    /// Finds a room by code. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn find_room(&self, code: &str) -> Result<Option<GameRoom>, DbError> {
        let mut conn = self.connection()?;

        let room = schema::game_rooms::table
            .filter(schema::game_rooms::code.eq(code))
            .first::<GameRoom>(&mut conn)
            .optional()?;

        Ok(room)
    }

    /// Persists a new active room.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the code collides with an existing room or a
    /// database error occurs.
    #[instrument(skip(self, new_room))]
    pub fn create_room(&self, new_room: NewGameRoom) -> Result<GameRoom, DbError> {
        let mut conn = self.connection()?;

        let room = diesel::insert_into(schema::game_rooms::table)
            .values(&new_room)
            .returning(GameRoom::as_returning())
            .get_result(&mut conn)?;

        info!(room_id = room.id(), code = %room.code(), "Room created");
        Ok(room)
    }

    /// Persists a new active room, treating a code collision as a retryable
    /// outcome rather than an error.
    ///
    /// Returns `None` if the code lost an insert race against another room
    /// with the same code; the caller regenerates and retries.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for any database error other than the code's
    /// unique-constraint violation.
    #[instrument(skip(self, new_room))]
    pub fn try_create_room(&self, new_room: NewGameRoom) -> Result<Option<GameRoom>, DbError> {
        let mut conn = self.connection()?;

        match diesel::insert_into(schema::game_rooms::table)
            .values(&new_room)
            .returning(GameRoom::as_returning())
            .get_result(&mut conn)
        {
            Ok(room) => {
                info!(room_id = room.id(), code = %room.code(), "Room created");
                Ok(Some(room))
            }
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                debug!("Room code already taken");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Administratively deactivates a room without committing match effects.
    ///
    /// Conditional on the room still being active; returns `false` if it was
    /// already inactive (idempotent no-op).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn deactivate_room(&self, code: &str) -> Result<bool, DbError> {
        let mut conn = self.connection()?;

        let affected = diesel::update(
            schema::game_rooms::table
                .filter(schema::game_rooms::code.eq(code))
                .filter(schema::game_rooms::is_active.eq(true)),
        )
        .set((
            schema::game_rooms::is_active.eq(false),
            schema::game_rooms::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

        if affected > 0 {
            info!(code, "Room deactivated");
        }
        Ok(affected > 0)
    }

    /// Deletes all inactive rooms. Best-effort cleanup before room creation.
    ///
    /// Match records played in a deleted room keep their `match_id` but lose
    /// the room link (`room_id` is nulled by the schema on delete).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_inactive_rooms(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;

        let deleted =
            diesel::delete(schema::game_rooms::table.filter(schema::game_rooms::is_active.eq(false)))
                .execute(&mut conn)?;

        if deleted > 0 {
            info!(count = deleted, "Inactive rooms deleted");
        }
        Ok(deleted)
    }

    /// Commits the persistent effects of one finalized match atomically.
    ///
    /// Within a single transaction: flips the room inactive via a conditional
    /// update, inserts one match record per entry, and upserts each player's
    /// leaderboard counters. The conditional update is the exactly-once guard:
    /// if another finalize already deactivated the room, zero rows are
    /// affected and the whole transaction aborts with
    /// [`GameError::RoomInactive`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoomInactive`] if the room was concurrently
    /// finalized, or [`GameError::Storage`] on commit failure. Either way no
    /// partial state is persisted.
    #[instrument(skip(self, entries), fields(room = %room.code(), match_id = %match_id))]
    pub fn finalize_match(
        &self,
        room: &GameRoom,
        match_id: &str,
        entries: &[MatchEntry],
    ) -> Result<(), GameError> {
        let mut conn = self.connection()?;

        conn.transaction::<_, GameError, _>(|conn| {
            let deactivated = diesel::update(
                schema::game_rooms::table
                    .filter(schema::game_rooms::id.eq(room.id()))
                    .filter(schema::game_rooms::is_active.eq(true)),
            )
            .set((
                schema::game_rooms::is_active.eq(false),
                schema::game_rooms::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

            if deactivated == 0 {
                debug!(code = %room.code(), "Room already finalized by another caller");
                return Err(GameError::RoomInactive {
                    code: room.code().clone(),
                });
            }

            for entry in entries {
                let record = NewMatchRecord::new(
                    *entry.user_id(),
                    Some(*room.id()),
                    match_id.to_string(),
                    entry.outcome().to_db_string().to_string(),
                    *entry.score(),
                    None,
                );
                diesel::insert_into(schema::game_sessions::table)
                    .values(&record)
                    .execute(conn)?;

                upsert_leaderboard(conn, *entry.user_id(), *room.game_type_id(), *entry.outcome())?;
            }

            Ok(())
        })?;

        info!(room = %room.code(), players = entries.len(), "Match finalized");
        Ok(())
    }

    /// Commits an externally-resolved match report in a single transaction:
    /// one match record plus one leaderboard upsert per entry.
    ///
    /// Catalog entities (game type, room, users) are expected to exist
    /// already; the reporting path ensures them idempotently beforehand.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on commit failure; no partial state is persisted.
    #[instrument(skip(self, entries), fields(room_id, match_id = %match_id))]
    pub fn record_report(
        &self,
        room_id: i32,
        game_type_id: i32,
        match_id: &str,
        duration_seconds: Option<i32>,
        entries: &[MatchEntry],
    ) -> Result<(), DbError> {
        let mut conn = self.connection()?;

        conn.transaction::<_, DbError, _>(|conn| {
            for entry in entries {
                let record = NewMatchRecord::new(
                    *entry.user_id(),
                    Some(room_id),
                    match_id.to_string(),
                    entry.outcome().to_db_string().to_string(),
                    *entry.score(),
                    duration_seconds,
                );
                diesel::insert_into(schema::game_sessions::table)
                    .values(&record)
                    .execute(conn)?;

                upsert_leaderboard(conn, *entry.user_id(), game_type_id, *entry.outcome())?;
            }
            Ok(())
        })?;

        info!(room_id, players = entries.len(), "Report recorded");
        Ok(())
    }

    /// Loads leaderboard entries for a game type joined with user identities,
    /// ordered by wins descending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn leaderboard_for(
        &self,
        game_type_id: i32,
    ) -> Result<Vec<(LeaderboardEntry, User)>, DbError> {
        let mut conn = self.connection()?;

        let rows = schema::leaderboard_entries::table
            .inner_join(schema::users::table)
            .filter(schema::leaderboard_entries::game_type_id.eq(game_type_id))
            .order(schema::leaderboard_entries::wins.desc())
            .select((LeaderboardEntry::as_select(), User::as_select()))
            .load::<(LeaderboardEntry, User)>(&mut conn)?;

        info!(game_type_id, count = rows.len(), "Leaderboard loaded");
        Ok(rows)
    }

    /// Loads a user's match records restricted to rooms of the given game
    /// type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn match_records_for(
        &self,
        user_id: i32,
        game_type_id: i32,
    ) -> Result<Vec<MatchRecord>, DbError> {
        let mut conn = self.connection()?;

        let records = schema::game_sessions::table
            .inner_join(schema::game_rooms::table)
            .filter(schema::game_sessions::user_id.eq(user_id))
            .filter(schema::game_rooms::game_type_id.eq(game_type_id))
            .select(MatchRecord::as_select())
            .load::<MatchRecord>(&mut conn)?;

        debug!(user_id, game_type_id, count = records.len(), "Match records loaded");
        Ok(records)
    }
}

/// Increments exactly one of wins/losses/draws for the (user, game type)
/// pair, creating a zeroed entry first if none exists. Counters never
/// decrement. Runs on the caller's connection so it participates in the
/// caller's transaction.
fn upsert_leaderboard(
    conn: &mut SqliteConnection,
    user_id: i32,
    game_type_id: i32,
    outcome: MatchOutcome,
) -> Result<(), diesel::result::Error> {
    use schema::leaderboard_entries as lb;

    let entry = match lb::table
        .filter(lb::user_id.eq(user_id))
        .filter(lb::game_type_id.eq(game_type_id))
        .first::<LeaderboardEntry>(conn)
        .optional()?
    {
        Some(existing) => existing,
        None => diesel::insert_into(lb::table)
            .values(&NewLeaderboardEntry::zeroed(user_id, game_type_id))
            .returning(LeaderboardEntry::as_returning())
            .get_result(conn)?,
    };

    match outcome {
        MatchOutcome::Win => diesel::update(&entry)
            .set(lb::wins.eq(lb::wins + 1))
            .execute(conn)?,
        MatchOutcome::Loss => diesel::update(&entry)
            .set(lb::losses.eq(lb::losses + 1))
            .execute(conn)?,
        MatchOutcome::Draw => diesel::update(&entry)
            .set(lb::draws.eq(lb::draws + 1))
            .execute(conn)?,
    };

    Ok(())
}
