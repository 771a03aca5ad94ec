//! JSON API over the opening store.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use opening_core::{pick_due, DueOpening, OpeningLine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chess;
use crate::config::Settings;
use crate::db::{
    DbError, EvalRepository, OpeningRepository, SqliteRepository, StoredEval, StudyRepository,
};
use crate::engine::{RawScore, UciEngine};

/// Shared application state.
pub struct AppState {
    repo: Mutex<SqliteRepository>,
    settings: Settings,
}

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

type Result<T> = std::result::Result<T, ApiError>;

pub async fn serve(settings: Settings, bind: &str) -> anyhow::Result<()> {
    let repo = SqliteRepository::open(&settings.db_path)?;
    let state = Arc::new(AppState {
        repo: Mutex::new(repo),
        settings,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/openings", get(list_openings))
        .route("/api/openings/{id}", get(get_opening))
        .route("/api/due", get(due))
        .route("/api/eval", post(eval_position))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("serving on {bind}");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
struct ListQuery {
    prefix: Option<String>,
    q: Option<String>,
    #[serde(default = "default_list_limit")]
    limit: usize,
}

fn default_list_limit() -> usize {
    500
}

/// GET /api/openings — list, filtered by name prefix or substring query.
async fn list_openings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OpeningLine>>> {
    let repo = state.repo.lock().expect("repository lock");
    let lines = match &query.q {
        Some(q) => repo.search_openings(q, query.limit)?,
        None => repo.list_openings(query.prefix.as_deref(), query.limit)?,
    };
    Ok(Json(lines))
}

#[derive(Serialize)]
struct EvalSummary {
    depth: u32,
    score_cp: Option<i64>,
    mate_in: Option<i32>,
    bestmove_uci: Option<String>,
}

impl From<StoredEval> for EvalSummary {
    fn from(stored: StoredEval) -> Self {
        Self {
            depth: stored.depth,
            score_cp: stored.score_cp,
            mate_in: stored.mate_in,
            bestmove_uci: stored.bestmove_uci,
        }
    }
}

#[derive(Serialize)]
struct OpeningDetail {
    #[serde(flatten)]
    line: OpeningLine,
    notes: String,
    eval: Option<EvalSummary>,
}

/// GET /api/openings/{id} — one opening with notes and latest evaluation.
async fn get_opening(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<OpeningDetail>> {
    let repo = state.repo.lock().expect("repository lock");
    let line = repo
        .get_opening(id)?
        .ok_or_else(|| ApiError::NotFound(format!("opening {id}")))?;
    let notes = repo.get_notes(id)?.unwrap_or_default();
    let eval = repo.latest_evaluation(id)?.map(EvalSummary::from);

    Ok(Json(OpeningDetail { line, notes, eval }))
}

#[derive(Deserialize)]
struct DueQuery {
    prefix: Option<String>,
    #[serde(default = "default_due_limit")]
    limit: usize,
}

fn default_due_limit() -> usize {
    20
}

/// GET /api/due — openings due for review today.
async fn due(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DueQuery>,
) -> Result<Json<Vec<DueOpening>>> {
    let today = Local::now().date_naive();
    let repo = state.repo.lock().expect("repository lock");
    let candidates = repo.due_candidates(query.prefix.as_deref())?;
    Ok(Json(pick_due(candidates, today, query.limit)))
}

#[derive(Deserialize)]
struct EvalRequest {
    fen: String,
    #[serde(default = "default_eval_depth")]
    depth: u32,
}

fn default_eval_depth() -> u32 {
    10
}

#[derive(Serialize)]
struct EvalResponse {
    score_cp: Option<i64>,
    mate_in: Option<i32>,
    depth: u32,
}

/// POST /api/eval — evaluate a position. Returns `null` when the engine
/// is unavailable or the FEN is invalid.
async fn eval_position(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvalRequest>,
) -> Json<Option<EvalResponse>> {
    let Ok(position) = chess::position_from_fen(&request.fen) else {
        return Json(None);
    };
    let Ok(path) = UciEngine::resolve_path(state.settings.stockfish_path.as_deref()) else {
        return Json(None);
    };
    let Ok(mut engine) = UciEngine::spawn(&path) else {
        return Json(None);
    };

    match engine.evaluate_fen(&chess::fen(&position), request.depth) {
        Ok(eval) => {
            let (score_cp, mate_in) = match eval.score {
                RawScore::Centipawns(cp) => (Some(cp), None),
                RawScore::Mate(m) => (None, Some(m)),
            };
            Json(Some(EvalResponse {
                score_cp,
                mate_in,
                depth: request.depth,
            }))
        }
        Err(e) => {
            tracing::warn!("evaluation failed: {e}");
            Json(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::NotFound("opening 7".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn database_errors_map_to_500() {
        let err = ApiError::Database(DbError::OpeningNotFound(1));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
