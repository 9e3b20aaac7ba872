//! Tests for leaderboard queries and per-user statistics.

use diesel::Connection;
use diesel::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tempfile::NamedTempFile;

use rps_arena::{
    GameError, GameRepository, IdentityService, LeaderboardService, MatchOutcome, MatchReport,
    MoveBuffer, PlayerReport, ReportService, SessionResolver,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn setup_leaderboard() -> (NamedTempFile, GameRepository, LeaderboardService) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let mut conn = SqliteConnection::establish(&db_path).expect("Failed to connect");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Migrations failed");

    let repo = GameRepository::new(db_path).expect("Failed to create repository");
    repo.ensure_game_type("rps", None).expect("Seed failed");

    let leaderboard = LeaderboardService::new(repo.clone());
    (db_file, repo, leaderboard)
}

/// Records a report crediting `winner` with a win over `loser`.
fn record_win(repo: &GameRepository, room: &str, winner: i64, loser: i64) {
    let report = MatchReport::new(
        "rps".to_string(),
        room.to_string(),
        None,
        vec![
            PlayerReport::new(winner, MatchOutcome::Win, 1),
            PlayerReport::new(loser, MatchOutcome::Loss, 0),
        ],
    );
    ReportService::new(repo.clone())
        .record(&report)
        .expect("Record failed");
}

#[test]
fn test_query_orders_by_wins_descending() {
    let (_db, repo, leaderboard) = setup_leaderboard();

    record_win(&repo, "ROOM01", 1, 2);
    record_win(&repo, "ROOM02", 1, 2);
    record_win(&repo, "ROOM03", 2, 1);
    record_win(&repo, "ROOM04", 3, 1);

    let standings = leaderboard.query("rps").expect("Query failed");
    assert_eq!(standings.len(), 3);
    assert_eq!(*standings[0].external_id(), 1);
    assert_eq!(*standings[0].wins(), 2);
    assert!(standings[1].wins() >= standings[2].wins());
}

#[test]
fn test_query_unknown_game_type_is_empty() {
    let (_db, _repo, leaderboard) = setup_leaderboard();
    let standings = leaderboard.query("chess").expect("Query failed");
    assert!(standings.is_empty());
}

#[test]
fn test_user_stats_zero_sessions() {
    let (_db, repo, leaderboard) = setup_leaderboard();
    IdentityService::new(repo)
        .sync_user(42, Some("Alice"))
        .expect("Sync failed");

    let stats = leaderboard.user_stats(42, "rps").expect("Stats failed");
    assert_eq!(*stats.total_games(), 0);
    assert_eq!(*stats.wins(), 0);
    assert_eq!(*stats.average_score(), 0.0);
}

#[test]
fn test_user_stats_unknown_user() {
    let (_db, _repo, leaderboard) = setup_leaderboard();
    let result = leaderboard.user_stats(999, "rps");
    assert!(matches!(
        result,
        Err(GameError::PlayerNotRegistered { external_id: 999 })
    ));
}

#[test]
fn test_user_stats_unknown_game_type() {
    let (_db, repo, leaderboard) = setup_leaderboard();
    IdentityService::new(repo)
        .sync_user(42, Some("Alice"))
        .expect("Sync failed");

    let result = leaderboard.user_stats(42, "chess");
    assert!(matches!(result, Err(GameError::GameTypeNotFound { .. })));
}

#[test]
fn test_user_stats_counts_and_average() {
    let (_db, repo, leaderboard) = setup_leaderboard();

    let report = MatchReport::new(
        "rps".to_string(),
        "ROOM01".to_string(),
        None,
        vec![
            PlayerReport::new(1, MatchOutcome::Win, 5),
            PlayerReport::new(2, MatchOutcome::Loss, 1),
        ],
    );
    ReportService::new(repo.clone())
        .record(&report)
        .expect("Record failed");
    record_win(&repo, "ROOM02", 2, 1);

    let stats = leaderboard.user_stats(1, "rps").expect("Stats failed");
    assert_eq!(*stats.total_games(), 2);
    assert_eq!(*stats.wins(), 1);
    assert_eq!(*stats.losses(), 1);
    assert_eq!(*stats.draws(), 0);
    // Scores 5 and 0 over two games.
    assert!((stats.average_score() - 2.5).abs() < f64::EPSILON);
}

#[test]
fn test_user_stats_spans_live_and_reported_matches() {
    let (_db, repo, leaderboard) = setup_leaderboard();

    let identity = IdentityService::new(repo.clone());
    identity.sync_user(1, Some("Alice")).expect("Sync failed");
    identity.sync_user(2, Some("Bob")).expect("Sync failed");

    // Live match: Alice wins (score 1).
    let resolver = SessionResolver::new(repo.clone(), MoveBuffer::new());
    let code = resolver.create_room("rps", 1).expect("Create failed");
    resolver.register_move(&code, 1, "rock").expect("Move failed");
    resolver
        .register_move(&code, 2, "scissors")
        .expect("Move failed");
    resolver.finalize(&code).expect("Finalize failed");

    // Reported match: Alice wins with score 5.
    let report = MatchReport::new(
        "rps".to_string(),
        "TOURN1".to_string(),
        Some(60),
        vec![
            PlayerReport::new(1, MatchOutcome::Win, 5),
            PlayerReport::new(2, MatchOutcome::Loss, 0),
        ],
    );
    ReportService::new(repo)
        .record(&report)
        .expect("Record failed");

    let stats = leaderboard.user_stats(1, "rps").expect("Stats failed");
    assert_eq!(*stats.total_games(), 2);
    assert_eq!(*stats.wins(), 2);
    assert!((stats.average_score() - 3.0).abs() < f64::EPSILON);

    let standings = leaderboard.query("rps").expect("Query failed");
    assert_eq!(*standings[0].wins(), 2);
    assert_eq!(*standings[1].losses(), 2);
}
