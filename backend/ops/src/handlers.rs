//! Ops route handlers.
//!
//! Every handler turns failures into its own JSON envelope; nothing here
//! returns a bare status code.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use clawkeeper_core::{CommandResult, LogsReport, RestartAck};
use clawkeeper_supervisor::{ConfigCommand, ConfigCommandKind};

use crate::error::ApiError;
use crate::server::OpsState;

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "clawkeeper",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /status`: ensures the gateway, then reports it.
pub async fn get_status(State(state): State<OpsState>) -> Response {
    match state.supervisor.status(&state.gateway_env).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            error!(error = %e, "Gateway status failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// `GET /processes`
pub async fn list_processes(State(state): State<OpsState>) -> Result<Json<Value>, ApiError> {
    let processes = state.supervisor.processes().await?;
    Ok(Json(json!({
        "count": processes.len(),
        "processes": processes,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub id: Option<String>,
}

fn logs_envelope(status: &str, message: String) -> Json<Value> {
    Json(json!({
        "status": status,
        "message": message,
        "stdout": "",
        "stderr": "",
    }))
}

/// `GET /logs?id=`: logs of the given process, or of the gateway.
pub async fn get_logs(State(state): State<OpsState>, Query(query): Query<LogsQuery>) -> Response {
    let id = query.id.as_deref().filter(|id| !id.is_empty());
    match state.supervisor.logs(id).await {
        Ok(LogsReport::Found {
            process_id,
            process_status,
            logs,
        }) => Json(json!({
            "status": "ok",
            "process_id": process_id,
            "process_status": process_status,
            "stdout": logs.stdout,
            "stderr": logs.stderr,
        }))
        .into_response(),
        Ok(LogsReport::NotFound { id }) => (
            StatusCode::NOT_FOUND,
            logs_envelope("not_found", format!("Process {id} not found")),
        )
            .into_response(),
        Ok(LogsReport::NoProcess) => logs_envelope(
            "no_process",
            "No gateway process is currently running".to_string(),
        )
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to get logs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                logs_envelope("error", format!("Failed to get logs: {e}")),
            )
                .into_response()
        }
    }
}

/// `POST /restart`: responds once the old gateway is gone; the relaunch
/// continues in the background.
pub async fn restart(State(state): State<OpsState>) -> Result<Json<RestartAck>, ApiError> {
    let ack = state.supervisor.restart(&state.gateway_env).await?;
    info!(previous = ?ack.previous_process_id, "Gateway restart initiated");
    Ok(Json(ack))
}

#[derive(Debug, Deserialize)]
pub struct ConfigQuery {
    pub path: Option<String>,
    pub value: Option<String>,
}

fn config_response(path: &str, result: CommandResult) -> Json<Value> {
    Json(json!({
        "success": result.success,
        "path": path,
        "status": result.status,
        "exitCode": result.exit_code,
        "stdout": result.stdout,
        "stderr": result.stderr,
        "timedOut": result.timed_out,
    }))
}

async fn run_config(
    state: OpsState,
    kind: ConfigCommandKind,
    query: ConfigQuery,
) -> Result<Json<Value>, ApiError> {
    let command =
        ConfigCommand::from_query(kind, query.path.as_deref(), query.value.as_deref())?;
    let result = state.proxy.run(&command, &state.gateway_env).await?;
    Ok(config_response(command.path(), result))
}

/// `GET /config/get?path=`
pub async fn config_get(
    State(state): State<OpsState>,
    Query(query): Query<ConfigQuery>,
) -> Result<Json<Value>, ApiError> {
    run_config(state, ConfigCommandKind::Get, query).await
}

/// `POST /config/set?path=&value=`
pub async fn config_set(
    State(state): State<OpsState>,
    Query(query): Query<ConfigQuery>,
) -> Result<Json<Value>, ApiError> {
    run_config(state, ConfigCommandKind::Set, query).await
}
