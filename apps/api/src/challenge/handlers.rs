//! Axum route handlers for the Challenge API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::challenge::machine::{NavigateTarget, SessionView, SubmitOutcome};
use crate::challenge::store::SharedSession;
use crate::errors::AppError;
use crate::llm_client::ModelInfo;
use crate::state::AppState;

/// Upper bound on a single submission, in characters.
const MAX_SUBMISSION_CHARS: usize = 2_000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmitOutcome,
    pub view: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub target: NavigateTarget,
}

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelInfo>,
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Creates a session and starts round 1 for the given player.
pub async fn handle_start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let mut session = state.machine.new_session();
    state.machine.start(&mut session, &request.player_id)?;
    let view = state.machine.view(&session);
    state.sessions.insert(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/v1/sessions/:id/start
///
/// Starts a fresh game on an existing idle session (after a reset).
pub async fn handle_restart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StartRequest>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id).await?;
    let mut session = shared.lock().await;
    state.machine.start(&mut session, &request.player_id)?;
    Ok(Json(state.machine.view(&session)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id).await?;
    let session = shared.lock().await;
    Ok(Json(state.machine.view(&session)))
}

/// POST /api/v1/sessions/:id/submit
///
/// Rejections (empty text, forbidden word) are a normal 200 response with
/// `outcome: "rejected"`; only transition errors map to 409.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    if request.text.chars().count() > MAX_SUBMISSION_CHARS {
        return Err(AppError::Validation(format!(
            "text must be at most {MAX_SUBMISSION_CHARS} characters"
        )));
    }

    let shared = find_session(&state, id).await?;
    let mut session = shared.lock().await;
    let outcome = state.machine.submit(&mut session, &request.text).await?;
    Ok(Json(SubmitResponse {
        outcome,
        view: state.machine.view(&session),
    }))
}

/// POST /api/v1/sessions/:id/advance
pub async fn handle_advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id).await?;
    let mut session = shared.lock().await;
    state.machine.advance(&mut session)?;
    Ok(Json(state.machine.view(&session)))
}

/// POST /api/v1/sessions/:id/navigate
pub async fn handle_navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id).await?;
    let mut session = shared.lock().await;
    state.machine.navigate(&mut session, request.target)?;
    Ok(Json(state.machine.view(&session)))
}

/// POST /api/v1/sessions/:id/reset
///
/// "Play again": returns a finished game to idle, keeping the session id.
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = find_session(&state, id).await?;
    let mut session = shared.lock().await;
    state.machine.reset(&mut session)?;
    Ok(Json(state.machine.view(&session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// GET /api/v1/models
///
/// Lists the models available to the configured API key.
pub async fn handle_list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelListResponse>, AppError> {
    let models = state
        .llm
        .list_models()
        .await
        .map_err(|e| AppError::Llm(format!("Model listing failed: {e}")))?;
    Ok(Json(ModelListResponse { models }))
}
