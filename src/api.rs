//! REST handlers. JSON in, JSON out — the command surface for the
//! dashboard frontend. Every mutation goes through submit(): apply under
//! the write lock, flush to the save file, broadcast to live sockets.

use crate::board::{
    AcademicPatch, AcademicTask, Board, BoardError, Category, Command, Event, Priority,
    SecondaryPatch, SecondaryTask, TaskType,
};
use crate::gate::{self, GateState, WeekStart};
use crate::persist::SaveFile;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub board: std::sync::RwLock<Board>,
    pub save_file: SaveFile,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
    pub week_start: WeekStart,
}

pub type SharedState = Arc<AppState>;

// ── Request types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateAcademicRequest {
    pub title: String,
    pub course: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(rename = "type", default = "default_task_type")]
    pub task_type: TaskType,
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_task_type() -> TaskType {
    TaskType::Other
}

#[derive(Debug, Deserialize)]
pub struct CreateSecondaryRequest {
    pub title: String,
    pub category: Category,
    pub description: Option<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub completed: bool,
}

// ── Helpers ────────────────────────────────────────────────────

/// Apply a command, flush the save file, broadcast the event.
/// All synchronous under the write lock — microseconds at this scale.
/// A flush failure is logged, not fatal: the in-memory board stays the
/// runtime truth and the save file catches up on the next mutation.
fn submit(state: &SharedState, cmd: Command) -> Result<Event, BoardError> {
    let event = {
        let mut board = state.board.write().unwrap();
        let event = board.apply(cmd, Utc::now())?;
        if let Err(e) = state.save_file.flush(&board, &event) {
            warn!(error = %e, "save file flush failed");
        }
        event
    };

    debug!(?event, "board mutated");

    if let Ok(json) = serde_json::to_string(&event) {
        let _ = state.events_tx.send(json);
    }
    Ok(event)
}

fn reject(err: BoardError) -> (StatusCode, String) {
    let code = match err {
        BoardError::TaskNotFound => StatusCode::NOT_FOUND,
        BoardError::EmptyTitle | BoardError::EmptyCourse => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (code, err.to_string())
}

// ── Academic task handlers ─────────────────────────────────────

// GET /api/academic-tasks
pub async fn list_academic(State(state): State<SharedState>) -> Json<Vec<AcademicTask>> {
    let board = state.board.read().unwrap();
    let mut tasks: Vec<AcademicTask> = board.academic.values().cloned().collect();
    // Pending first, then soonest due date
    tasks.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then(a.due_date.cmp(&b.due_date))
            .then(a.id.cmp(&b.id))
    });
    Json(tasks)
}

// POST /api/academic-tasks
pub async fn create_academic(
    State(state): State<SharedState>,
    Json(payload): Json<CreateAcademicRequest>,
) -> Result<(StatusCode, Json<AcademicTask>), (StatusCode, String)> {
    let event = submit(
        &state,
        Command::CreateAcademic {
            title: payload.title,
            course: payload.course,
            description: payload.description,
            due_date: payload.due_date,
            priority: payload.priority,
            task_type: payload.task_type,
        },
    )
    .map_err(reject)?;

    match event {
        Event::AcademicCreated { task, .. } => Ok((StatusCode::CREATED, Json(task))),
        _ => Err((StatusCode::INTERNAL_SERVER_ERROR, "unexpected event".into())),
    }
}

// PATCH /api/academic-tasks/:id
pub async fn update_academic(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AcademicPatch>,
) -> Result<Json<AcademicTask>, (StatusCode, String)> {
    let event = submit(&state, Command::UpdateAcademic { id, patch }).map_err(reject)?;

    match event {
        Event::AcademicUpdated { task, .. } => Ok(Json(task)),
        _ => Err((StatusCode::INTERNAL_SERVER_ERROR, "unexpected event".into())),
    }
}

// POST /api/academic-tasks/:id/toggle
pub async fn toggle_academic(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<AcademicTask>, (StatusCode, String)> {
    let event = submit(
        &state,
        Command::ToggleAcademic { id, completed: payload.completed },
    )
    .map_err(reject)?;

    match event {
        Event::AcademicUpdated { task, .. } => Ok(Json(task)),
        _ => Err((StatusCode::INTERNAL_SERVER_ERROR, "unexpected event".into())),
    }
}

// DELETE /api/academic-tasks/:id
pub async fn delete_academic(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    submit(&state, Command::DeleteAcademic { id }).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Secondary task handlers ────────────────────────────────────

// GET /api/secondary-tasks
pub async fn list_secondary(State(state): State<SharedState>) -> Json<Vec<SecondaryTask>> {
    let board = state.board.read().unwrap();
    let mut tasks: Vec<SecondaryTask> = board.secondary.values().cloned().collect();
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Json(tasks)
}

// POST /api/secondary-tasks
pub async fn create_secondary(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSecondaryRequest>,
) -> Result<(StatusCode, Json<SecondaryTask>), (StatusCode, String)> {
    let event = submit(
        &state,
        Command::CreateSecondary {
            title: payload.title,
            category: payload.category,
            description: payload.description,
            goal: payload.goal,
        },
    )
    .map_err(reject)?;

    match event {
        Event::SecondaryCreated { task, .. } => Ok((StatusCode::CREATED, Json(task))),
        _ => Err((StatusCode::INTERNAL_SERVER_ERROR, "unexpected event".into())),
    }
}

// PATCH /api/secondary-tasks/:id
pub async fn update_secondary(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SecondaryPatch>,
) -> Result<Json<SecondaryTask>, (StatusCode, String)> {
    let event = submit(&state, Command::UpdateSecondary { id, patch }).map_err(reject)?;

    match event {
        Event::SecondaryUpdated { task, .. } => Ok(Json(task)),
        _ => Err((StatusCode::INTERNAL_SERVER_ERROR, "unexpected event".into())),
    }
}

// DELETE /api/secondary-tasks/:id
pub async fn delete_secondary(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    submit(&state, Command::DeleteSecondary { id }).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/secondary-tasks/:id/toggle
pub async fn toggle_secondary(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<SecondaryTask>, (StatusCode, String)> {
    let event = submit(
        &state,
        Command::ToggleSecondary { id, completed: payload.completed },
    )
    .map_err(reject)?;

    match event {
        Event::SecondaryUpdated { task, .. } => Ok(Json(task)),
        _ => Err((StatusCode::INTERNAL_SERVER_ERROR, "unexpected event".into())),
    }
}

// ── Dashboard ──────────────────────────────────────────────────

// GET /api/dashboard
pub async fn dashboard(State(state): State<SharedState>) -> Json<GateState> {
    let board = state.board.read().unwrap();
    let academic: Vec<AcademicTask> = board.academic.values().cloned().collect();
    let secondary: Vec<SecondaryTask> = board.secondary.values().cloned().collect();
    Json(gate::compute_gate_state(
        &academic,
        &secondary,
        Utc::now(),
        state.week_start,
    ))
}
