//! rps_arena - service entry point.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use diesel::{Connection, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use rps_arena::{AppState, GameRepository, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database file used when neither --db-path nor DATABASE_URL is set.
const DEFAULT_DB_PATH: &str = "rps_arena.db";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            host,
            port,
            db_path,
        } => run_server(host, port, resolve_db_path(db_path)).await,
        Command::Migrate { db_path } => run_migrations(&resolve_db_path(db_path)),
    }
}

/// Resolves the database path: CLI flag, then DATABASE_URL, then default.
fn resolve_db_path(db_path: Option<String>) -> String {
    db_path
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
}

/// Applies pending migrations to the database at the given path.
fn run_migrations(db_path: &str) -> Result<()> {
    info!(db_path, "Applying pending migrations");
    let mut conn = SqliteConnection::establish(db_path)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migrations failed: {e}"))?;
    info!("Migrations up to date");
    Ok(())
}

/// Runs the HTTP service.
async fn run_server(host: String, port: u16, db_path: String) -> Result<()> {
    run_migrations(&db_path)?;

    let repository = GameRepository::new(db_path)?;
    // Seed the game type catalog; idempotent across restarts.
    repository.ensure_game_type("rps", Some("Rock, paper, scissors"))?;

    let state = AppState::new(repository);
    let app = router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "rps_arena listening");

    axum::serve(listener, app).await?;
    Ok(())
}
