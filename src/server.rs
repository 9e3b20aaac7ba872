//! Thin HTTP shell over the match-session core.
//!
//! One route per core operation; JSON field names are a presentation concern
//! layered on the core's operations, which is why request/response types
//! live here and not in the service modules.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::db::{GameRepository, MatchOutcome};
use crate::identity::IdentityService;
use crate::leaderboard::LeaderboardService;
use crate::moves::MoveBuffer;
use crate::report::{MatchReport, PlayerReport, ReportService};
use crate::session::{MoveStatus, SessionResolver};
use crate::GameError;

/// Shared application state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live match-session orchestration.
    pub resolver: SessionResolver,
    /// Player identity upserts and lookups.
    pub identity: IdentityService,
    /// Leaderboard and statistics queries.
    pub leaderboard: LeaderboardService,
    /// Externally-resolved match ingest.
    pub reports: ReportService,
}

impl AppState {
    /// Wires all services over one repository and a fresh move buffer.
    #[instrument(skip(repository))]
    pub fn new(repository: GameRepository) -> Self {
        info!("Creating application state");
        Self {
            resolver: SessionResolver::new(repository.clone(), MoveBuffer::new()),
            identity: IdentityService::new(repository.clone()),
            leaderboard: LeaderboardService::new(repository.clone()),
            reports: ReportService::new(repository),
        }
    }
}

/// Builds the application router.
#[instrument(skip(state))]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rooms", post(create_room))
        .route("/rooms/{code}/moves", post(register_move))
        .route("/rooms/{code}/finalize", post(finalize))
        .route("/users/sync", post(sync_user))
        .route("/users", get(list_users))
        .route("/users/{external_id}/stats", get(user_stats))
        .route("/reports", post(record_report))
        .route("/leaderboard", get(leaderboard))
        .with_state(state)
}

/// Error shape returned to HTTP callers; each core error kind maps to a
/// distinct status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        let status = match &err {
            GameError::RoomNotFound { .. }
            | GameError::PlayerNotRegistered { .. }
            | GameError::GameTypeNotFound { .. } => StatusCode::NOT_FOUND,
            GameError::RoomInactive { .. } => StatusCode::CONFLICT,
            GameError::InvalidChoice { .. } | GameError::InsufficientMoves { .. } => {
                StatusCode::BAD_REQUEST
            }
            GameError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, error = %self.message, "Request failed");
        (self.status, axum::Json(json!({ "error": self.message }))).into_response()
    }
}

/// Request body for room creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    /// Game type name (e.g. "rps").
    pub game_type: String,
    /// Requesting player's external platform id.
    pub external_id: i64,
}

/// Request body for move submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Submitting player's external platform id.
    pub external_id: i64,
    /// The move ("rock", "paper", or "scissors").
    pub choice: String,
}

/// Request body for identity sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncUserRequest {
    /// The player's external platform id.
    pub external_id: i64,
    /// Optional display name; empty names never overwrite an existing one.
    pub display_name: Option<String>,
}

/// One player's line in a report request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPlayerRequest {
    /// The player's external platform id.
    pub external_id: i64,
    /// Result tag: "win", "loss", or "draw".
    pub result: String,
    /// Score to credit; defaults to 0.
    pub score: Option<i32>,
}

/// Request body for an externally-resolved match report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Game type name; created if missing.
    pub game_type: String,
    /// Room code; created if missing.
    pub room_code: String,
    /// Optional match duration in seconds.
    pub duration_seconds: Option<i32>,
    /// Two or more player results.
    pub players: Vec<ReportPlayerRequest>,
}

/// Query string for leaderboard and stats lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct GameTypeQuery {
    /// Game type name to scope the query to.
    pub game_type: String,
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(json!({ "status": "OK" }))
}

#[instrument(skip(state, req), fields(game_type = %req.game_type, external_id = req.external_id))]
async fn create_room(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<CreateRoomRequest>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let code = state.resolver.create_room(&req.game_type, req.external_id)?;
    Ok(axum::Json(json!({ "room_code": code })))
}

#[instrument(skip(state, req), fields(room = %code, external_id = req.external_id))]
async fn register_move(
    State(state): State<AppState>,
    Path(code): Path<String>,
    axum::Json(req): axum::Json<MoveRequest>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let status = state
        .resolver
        .register_move(&code, req.external_id, &req.choice)?;

    let body = match status {
        MoveStatus::Waiting { count } => json!({
            "status": "Move registered, waiting for opponent",
            "moves": count,
        }),
        MoveStatus::Ready { players } => json!({
            "status": "Ready to end session",
            "players": players,
        }),
    };
    Ok(axum::Json(body))
}

#[instrument(skip(state), fields(room = %code))]
async fn finalize(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let summary = state.resolver.finalize(&code)?;

    let players: Vec<_> = summary
        .players()
        .iter()
        .map(|p| {
            json!({
                "external_id": p.external_id(),
                "display_name": p.display_name(),
                "choice": p.choice(),
                "result": p.outcome().to_db_string(),
                "score": p.score(),
            })
        })
        .collect();

    Ok(axum::Json(json!({
        "message": "Game session ended",
        "match_id": summary.match_id(),
        "room_code": summary.room_code(),
        "players": players,
    })))
}

#[instrument(skip(state, req), fields(external_id = req.external_id))]
async fn sync_user(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<SyncUserRequest>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let user = state
        .identity
        .sync_user(req.external_id, req.display_name.as_deref())?;
    Ok(axum::Json(json!({ "status": "synced", "user_id": user.id() })))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let users: Vec<_> = state
        .identity
        .list()?
        .iter()
        .map(|u| {
            json!({
                "id": u.id(),
                "external_id": u.external_id(),
                "display_name": u.display_name(),
            })
        })
        .collect();
    Ok(axum::Json(json!(users)))
}

#[instrument(skip(state, query), fields(external_id, game_type = %query.game_type))]
async fn user_stats(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
    Query(query): Query<GameTypeQuery>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let stats = state.leaderboard.user_stats(external_id, &query.game_type)?;
    Ok(axum::Json(json!({
        "total_games": stats.total_games(),
        "wins": stats.wins(),
        "losses": stats.losses(),
        "draws": stats.draws(),
        "average_score": stats.average_score(),
    })))
}

#[instrument(skip(state, req), fields(game_type = %req.game_type, room = %req.room_code))]
async fn record_report(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<ReportRequest>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let mut players = Vec::with_capacity(req.players.len());
    for player in &req.players {
        let outcome = MatchOutcome::from_db_string(&player.result)
            .map_err(|_| ApiError::bad_request(format!("Invalid result tag: '{}'", player.result)))?;
        players.push(PlayerReport::new(
            player.external_id,
            outcome,
            player.score.unwrap_or(0),
        ));
    }

    let report = MatchReport::new(req.game_type, req.room_code, req.duration_seconds, players);
    let match_id = state.reports.record(&report)?;
    Ok(axum::Json(json!({ "status": "recorded", "match_id": match_id })))
}

#[instrument(skip(state, query), fields(game_type = %query.game_type))]
async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<GameTypeQuery>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let standings: Vec<_> = state
        .leaderboard
        .query(&query.game_type)?
        .iter()
        .map(|s| {
            json!({
                "external_id": s.external_id(),
                "display_name": s.display_name(),
                "wins": s.wins(),
                "losses": s.losses(),
                "draws": s.draws(),
            })
        })
        .collect();
    Ok(axum::Json(json!(standings)))
}
