//! Command-line interface for rps_arena.

use clap::{Parser, Subcommand};

/// rps_arena - match-session service with persistent leaderboards
#[derive(Parser, Debug)]
#[command(name = "rps_arena")]
#[command(about = "Rock-paper-scissors match sessions and leaderboards", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Path to the database file (falls back to DATABASE_URL, then "rps_arena.db")
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Apply pending database migrations and exit
    Migrate {
        /// Path to the database file (falls back to DATABASE_URL, then "rps_arena.db")
        #[arg(long)]
        db_path: Option<String>,
    },
}
