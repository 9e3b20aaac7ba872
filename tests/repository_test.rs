//! Tests for database repository operations.

use diesel::Connection;
use diesel::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tempfile::NamedTempFile;

use rps_arena::{GameError, GameRepository, MatchEntry, MatchOutcome, NewGameRoom, NewUser};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, GameRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut conn = SqliteConnection::establish(&db_path).expect("Failed to connect");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Migrations failed");

    let repo = GameRepository::new(db_path).expect("Failed to create repository");
    (db_file, repo)
}

#[test]
fn test_create_and_find_user() {
    let (_db, repo) = setup_test_db();
    let user = repo
        .create_user(NewUser::new(42, "Alice".to_string()))
        .expect("Create failed");
    assert_eq!(*user.external_id(), 42);
    assert_eq!(user.display_name(), "Alice");
    assert!(*user.id() > 0);

    let found = repo.find_user(42).expect("Query failed");
    assert_eq!(found.unwrap().id(), user.id());
}

#[test]
fn test_duplicate_external_id_fails() {
    let (_db, repo) = setup_test_db();
    repo.create_user(NewUser::new(42, "Alice".to_string()))
        .expect("First create failed");
    let result = repo.create_user(NewUser::new(42, "Impostor".to_string()));
    assert!(result.is_err(), "Duplicate external id should fail");
}

#[test]
fn test_find_user_not_found() {
    let (_db, repo) = setup_test_db();
    let found = repo.find_user(999).expect("Query failed");
    assert!(found.is_none());
}

#[test]
fn test_update_display_name() {
    let (_db, repo) = setup_test_db();
    let user = repo
        .create_user(NewUser::new(42, "unknown".to_string()))
        .expect("Create failed");
    let updated = repo
        .update_display_name(*user.id(), "Alice")
        .expect("Update failed");
    assert_eq!(updated.display_name(), "Alice");
    assert_eq!(updated.id(), user.id());
}

#[test]
fn test_list_users_ordered_by_creation() {
    let (_db, repo) = setup_test_db();
    for (external_id, name) in [(1, "Alpha"), (2, "Beta"), (3, "Gamma")] {
        repo.create_user(NewUser::new(external_id, name.to_string()))
            .expect("Create failed");
    }

    let users = repo.list_users().expect("List failed");
    assert_eq!(users.len(), 3);
    assert_eq!(users[0].display_name(), "Alpha");
    assert_eq!(users[2].display_name(), "Gamma");
}

#[test]
fn test_ensure_game_type_idempotent() {
    let (_db, repo) = setup_test_db();
    let first = repo
        .ensure_game_type("rps", Some("Rock, paper, scissors"))
        .expect("Ensure failed");
    let second = repo.ensure_game_type("rps", None).expect("Ensure failed");
    assert_eq!(first.id(), second.id());
    assert_eq!(second.name(), "rps");
}

#[test]
fn test_find_game_type_not_found() {
    let (_db, repo) = setup_test_db();
    let found = repo.find_game_type("chess").expect("Query failed");
    assert!(found.is_none());
}

#[test]
fn test_create_and_find_room() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");
    let room = repo
        .create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()))
        .expect("Create failed");
    assert!(*room.is_active());

    let found = repo.find_room("AB12CD").expect("Query failed");
    assert_eq!(found.unwrap().id(), room.id());
}

#[test]
fn test_room_code_unique() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");
    repo.create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()))
        .expect("Create failed");
    let result = repo.create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()));
    assert!(result.is_err(), "Duplicate room code should fail");
}

#[test]
fn test_try_create_room_code_collision_is_not_an_error() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");

    let first = repo
        .try_create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()))
        .expect("Create failed");
    assert!(first.is_some());

    let second = repo
        .try_create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()))
        .expect("Collision should not surface as an error");
    assert!(second.is_none(), "Losing the code race yields None");
}

#[test]
fn test_deactivate_room_is_idempotent() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");
    repo.create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()))
        .expect("Create failed");

    assert!(repo.deactivate_room("AB12CD").expect("Deactivate failed"));
    assert!(
        !repo.deactivate_room("AB12CD").expect("Deactivate failed"),
        "Second deactivate is a no-op"
    );
    let room = repo.find_room("AB12CD").expect("Query failed").unwrap();
    assert!(!room.is_active());
}

#[test]
fn test_finalize_match_commits_all_effects() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");
    let room = repo
        .create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()))
        .expect("Create failed");
    let alice = repo
        .create_user(NewUser::new(1, "Alice".to_string()))
        .expect("Create failed");
    let bob = repo
        .create_user(NewUser::new(2, "Bob".to_string()))
        .expect("Create failed");

    let entries = [
        MatchEntry::new(*alice.id(), MatchOutcome::Win, 1),
        MatchEntry::new(*bob.id(), MatchOutcome::Loss, 0),
    ];
    repo.finalize_match(&room, "match-1", &entries)
        .expect("Finalize failed");

    let room = repo.find_room("AB12CD").expect("Query failed").unwrap();
    assert!(!room.is_active(), "Room should be inactive after finalize");

    let alice_records = repo
        .match_records_for(*alice.id(), *game_type.id())
        .expect("Records failed");
    assert_eq!(alice_records.len(), 1);
    assert_eq!(alice_records[0].result(), "win");
    assert_eq!(alice_records[0].match_id(), "match-1");

    let standings = repo.leaderboard_for(*game_type.id()).expect("Query failed");
    assert_eq!(standings.len(), 2);
    let (entry, user) = &standings[0];
    assert_eq!(user.id(), alice.id());
    assert_eq!(*entry.wins(), 1);
}

#[test]
fn test_finalize_match_second_call_room_inactive() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");
    let room = repo
        .create_room(NewGameRoom::new("AB12CD".to_string(), *game_type.id()))
        .expect("Create failed");
    let alice = repo
        .create_user(NewUser::new(1, "Alice".to_string()))
        .expect("Create failed");
    let bob = repo
        .create_user(NewUser::new(2, "Bob".to_string()))
        .expect("Create failed");

    let entries = [
        MatchEntry::new(*alice.id(), MatchOutcome::Draw, 0),
        MatchEntry::new(*bob.id(), MatchOutcome::Draw, 0),
    ];
    repo.finalize_match(&room, "match-1", &entries)
        .expect("First finalize failed");

    let result = repo.finalize_match(&room, "match-2", &entries);
    assert!(matches!(result, Err(GameError::RoomInactive { .. })));

    // Double finalize must not double-apply leaderboard effects.
    let standings = repo.leaderboard_for(*game_type.id()).expect("Query failed");
    for (entry, _) in &standings {
        assert_eq!(*entry.draws(), 1);
    }
}

#[test]
fn test_delete_inactive_rooms() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");
    let stale = repo
        .create_room(NewGameRoom::new("STALE1".to_string(), *game_type.id()))
        .expect("Create failed");
    repo.create_room(NewGameRoom::new("LIVE01".to_string(), *game_type.id()))
        .expect("Create failed");
    let alice = repo
        .create_user(NewUser::new(1, "Alice".to_string()))
        .expect("Create failed");
    let bob = repo
        .create_user(NewUser::new(2, "Bob".to_string()))
        .expect("Create failed");

    // A finalized room carries match records; deleting it must not trip
    // over them.
    let entries = [
        MatchEntry::new(*alice.id(), MatchOutcome::Win, 1),
        MatchEntry::new(*bob.id(), MatchOutcome::Loss, 0),
    ];
    repo.finalize_match(&stale, "match-1", &entries)
        .expect("Finalize failed");

    let deleted = repo.delete_inactive_rooms().expect("Cleanup failed");
    assert_eq!(deleted, 1);
    assert!(repo.find_room("STALE1").expect("Query failed").is_none());
    assert!(repo.find_room("LIVE01").expect("Query failed").is_some());

    // The room link is severed but the history and counters survive.
    let standings = repo.leaderboard_for(*game_type.id()).expect("Query failed");
    assert_eq!(standings.len(), 2);
    assert_eq!(*standings[0].0.wins(), 1);
}

#[test]
fn test_leaderboard_counters_accumulate() {
    let (_db, repo) = setup_test_db();
    let game_type = repo.ensure_game_type("rps", None).expect("Ensure failed");
    let alice = repo
        .create_user(NewUser::new(1, "Alice".to_string()))
        .expect("Create failed");
    let bob = repo
        .create_user(NewUser::new(2, "Bob".to_string()))
        .expect("Create failed");

    for (i, outcome) in [MatchOutcome::Win, MatchOutcome::Win, MatchOutcome::Draw]
        .iter()
        .enumerate()
    {
        let room = repo
            .create_room(NewGameRoom::new(format!("ROOM0{i}"), *game_type.id()))
            .expect("Create failed");
        let opposite = match outcome {
            MatchOutcome::Win => MatchOutcome::Loss,
            MatchOutcome::Loss => MatchOutcome::Win,
            MatchOutcome::Draw => MatchOutcome::Draw,
        };
        let entries = [
            MatchEntry::new(*alice.id(), *outcome, outcome.score()),
            MatchEntry::new(*bob.id(), opposite, opposite.score()),
        ];
        repo.finalize_match(&room, &format!("match-{i}"), &entries)
            .expect("Finalize failed");
    }

    let standings = repo.leaderboard_for(*game_type.id()).expect("Query failed");
    assert_eq!(standings.len(), 2);
    let (alice_entry, user) = &standings[0];
    assert_eq!(user.id(), alice.id(), "Most wins sorts first");
    assert_eq!(*alice_entry.wins(), 2);
    assert_eq!(*alice_entry.draws(), 1);
    assert_eq!(*alice_entry.losses(), 0);
}

#[test]
fn test_match_outcome_round_trip() {
    for outcome in &[MatchOutcome::Win, MatchOutcome::Loss, MatchOutcome::Draw] {
        let s = outcome.to_db_string();
        let parsed = MatchOutcome::from_db_string(s).expect("Parse failed");
        assert_eq!(*outcome, parsed);
    }
}

#[test]
fn test_match_outcome_invalid_string() {
    let result = MatchOutcome::from_db_string("invalid");
    assert!(result.is_err());
}
