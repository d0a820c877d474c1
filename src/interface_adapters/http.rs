// HTTP run-control handlers and shared response types for consistent API error payloads.

use crate::domain::CommandId;
use crate::interface_adapters::protocol::{
    AckResponse, BreakpointResponse, DebugRequest, InputRequest, LevelRequest, RunRequest,
    RunResponse, SpeedRequest, SpeedResponse, StateDto, decode_program,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ControlError, Runtime, StartOutcome};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

pub async fn run_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunRequest>,
) -> Response {
    let program = match decode_program(&payload.program) {
        Ok(program) => program,
        Err(e) => {
            warn!(error = %e, "rejected program");
            return error_response(StatusCode::BAD_REQUEST, e);
        }
    };
    let commands = program.len();

    match state.runtime.start(payload.domain, program) {
        StartOutcome::Started { run_id } => {
            info!(run_id, domain = %payload.domain, commands, "run accepted");
            (
                StatusCode::ACCEPTED,
                Json(RunResponse {
                    started: true,
                    run_id: Some(run_id),
                    commands,
                }),
            )
                .into_response()
        }
        StartOutcome::AlreadyRunning => (
            StatusCode::CONFLICT,
            Json(RunResponse {
                started: false,
                run_id: None,
                commands,
            }),
        )
            .into_response(),
    }
}

pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    Json(AckResponse {
        applied: state.runtime.stop(),
    })
}

pub async fn speed_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SpeedRequest>,
) -> Json<SpeedResponse> {
    Json(SpeedResponse {
        speed: state.runtime.set_speed(payload.multiplier),
    })
}

pub async fn debug_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DebugRequest>,
) -> Json<AckResponse> {
    state.runtime.set_debug_enabled(payload.enabled);
    Json(AckResponse { applied: true })
}

pub async fn breakpoint_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Response {
    let id = CommandId(id);
    match state.runtime.toggle_breakpoint(id) {
        Ok(has_breakpoint) => Json(BreakpointResponse { id, has_breakpoint }).into_response(),
        Err(e @ ControlError::UnknownCommand(_)) => error_response(StatusCode::NOT_FOUND, e),
        Err(e @ ControlError::NoProgram) => error_response(StatusCode::CONFLICT, e),
    }
}

pub async fn step_handler(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    Json(AckResponse {
        applied: state.runtime.step(),
    })
}

pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    Json(AckResponse {
        applied: state.runtime.pause(),
    })
}

pub async fn resume_handler(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    Json(AckResponse {
        applied: state.runtime.resume(),
    })
}

pub async fn input_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InputRequest>,
) -> StatusCode {
    state.runtime.set_input(payload.into());
    StatusCode::NO_CONTENT
}

pub async fn level_handler(
    State(state): State<Arc<AppState>>,
    Json(level): Json<LevelRequest>,
) -> StatusCode {
    info!(platforms = level.platforms.len(), "level loaded");
    state.runtime.load_level(level);
    StatusCode::NO_CONTENT
}

pub async fn state_handler(State(state): State<Arc<AppState>>) -> Json<StateDto> {
    Json(latest_state(&state.runtime))
}

/// Clones the latest published frames without holding any borrow across an await.
pub fn latest_state(runtime: &Runtime) -> StateDto {
    StateDto {
        status: runtime.status().borrow().clone(),
        device: runtime.device().borrow().clone(),
        entity: runtime.entity().borrow().clone(),
        screen: runtime.screen().borrow().clone(),
    }
}
