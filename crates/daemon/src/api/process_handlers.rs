//! REST handlers for `/api/v1/compile` and `/api/v1/processes/*`.

use crate::supervisor::Supervisor;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use optimus_core::CompileError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct CompileResponse {
    pub bytecode: Vec<optimus_core::Instruction>,
    pub data_base64: String,
    pub warnings: Vec<WireWarning>,
}

#[derive(Debug, Serialize)]
pub struct WireWarning {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub line: usize,
    pub message: String,
}

impl From<CompileError> for ErrorResponse {
    fn from(e: CompileError) -> Self {
        Self { line: e.line, message: e.message }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

pub async fn compile_handler(
    State(supervisor): State<Arc<Supervisor>>,
    Json(req): Json<CompileRequest>,
) -> Result<Json<CompileResponse>, ErrorResponse> {
    let (bytecode, data, warnings) = supervisor.compile_source(&req.source)?;
    Ok(Json(CompileResponse {
        bytecode,
        data_base64: base64::engine::general_purpose::STANDARD.encode(data),
        warnings: warnings.into_iter().map(|w| WireWarning { line: w.line, message: w.message }).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateProcessRequest {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct CreateProcessResponse {
    pub pid: u32,
}

pub async fn create_process_handler(
    State(supervisor): State<Arc<Supervisor>>,
    Json(req): Json<CreateProcessRequest>,
) -> Result<Json<CreateProcessResponse>, ErrorResponse> {
    let (instructions, data, _warnings) = supervisor.compile_source(&req.source)?;
    let pid = supervisor.spawn(req.name, instructions, data);
    Ok(Json(CreateProcessResponse { pid }))
}

#[derive(Debug, Serialize)]
pub struct ListProcessesResponse {
    pub processes: Vec<optimus_core::ProcessSnapshot>,
}

pub async fn list_processes_handler(State(supervisor): State<Arc<Supervisor>>) -> Json<ListProcessesResponse> {
    Json(ListProcessesResponse { processes: supervisor.list() })
}

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub line: String,
}

pub async fn input_handler(
    State(supervisor): State<Arc<Supervisor>>,
    Path(pid): Path<u32>,
    Json(req): Json<InputRequest>,
) -> StatusCode {
    supervisor.resolve_input(pid, &req.line);
    StatusCode::NO_CONTENT
}

pub async fn kill_handler(State(supervisor): State<Arc<Supervisor>>, Path(pid): Path<u32>) -> StatusCode {
    supervisor.kill(pid);
    StatusCode::NO_CONTENT
}
