//! Axum route handlers for the Screening API.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;

use crate::assets::handlers::read_files;
use crate::errors::AppError;
use crate::screening::history::HistoryEntry;
use crate::screening::result::ScreeningResult;
use crate::screening::session::{SessionSnapshot, SessionState};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ScreeningResponse {
    pub generation: u64,
    pub state: SessionState,
    pub result: ScreeningResult,
    pub meets_threshold: bool,
}

#[derive(Debug, Serialize)]
pub struct CurrentSessionResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    /// Session result, or the replayed history entry when one is selected.
    pub current_result: Option<ScreeningResult>,
    pub meets_threshold: Option<bool>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/screenings
///
/// Takes one resume as multipart field `file` and runs a full screening
/// session. Responds once the session has succeeded or failed.
pub async fn handle_start_screening(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ScreeningResponse>, AppError> {
    let file = read_files(multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("A resume file is required".to_string()))?;

    if !file.has_accepted_extension() {
        return Err(AppError::Validation(format!(
            "'{}' is not a PDF, DOCX or DOC file",
            file.name
        )));
    }

    let result = state.orchestrator.start_screen(file).await?;
    let snapshot = state.orchestrator.snapshot();

    Ok(Json(ScreeningResponse {
        generation: snapshot.generation,
        state: snapshot.state,
        meets_threshold: result.meets_threshold(state.config.fit_threshold),
        result,
    }))
}

/// GET /api/v1/screenings/current
pub async fn handle_current_session(State(state): State<AppState>) -> Json<CurrentSessionResponse> {
    let snapshot = state.orchestrator.snapshot();
    let current_result = state.orchestrator.current_result();
    let meets_threshold = current_result
        .as_ref()
        .map(|r| r.meets_threshold(state.config.fit_threshold));

    Json(CurrentSessionResponse {
        snapshot,
        current_result,
        meets_threshold,
    })
}

/// POST /api/v1/screenings/reset
pub async fn handle_reset(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.orchestrator.reset())
}

/// GET /api/v1/history
pub async fn handle_list_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.orchestrator.history())
}

/// GET /api/v1/history/:id
///
/// Selects the entry for display and returns it. No network call is made.
pub async fn handle_select_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryEntry>, AppError> {
    state
        .orchestrator
        .select_history(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("History entry {id} not found")))
}
