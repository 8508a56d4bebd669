use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use prochub_core::{Catalog, CatalogError, ProcessSnapshot, Supervisor, SupervisorError};

#[derive(Clone)]
pub struct AppState {
	pub supervisor: Arc<Supervisor>,
	pub catalog_path: Arc<PathBuf>,
}

pub fn router(supervisor: Arc<Supervisor>, catalog_path: PathBuf) -> Router {
	let state = AppState {
		supervisor,
		catalog_path: Arc::new(catalog_path),
	};

	Router::new()
		.route("/processes", get(list_processes))
		.route("/processes/reload", post(reload_catalog))
		.route("/processes/update", post(update_catalog))
		.route("/processes/{name}", get(get_process))
		.route("/processes/{name}/start", post(start_process))
		.route("/processes/{name}/stop", post(stop_process))
		.route("/processes/{name}/status", get(process_status))
		.route("/processes/{name}/logs", get(process_logs))
		.layer(CorsLayer::permissive())
		.with_state(state)
}

#[derive(Serialize)]
struct ErrorResponse {
	error: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	logs: Option<Vec<String>>,
}

#[derive(Serialize)]
struct LogsResponse {
	logs: Vec<String>,
	unread_bytes: usize,
}

/// Conflict-class failures map to 409, unknown names to 404, everything
/// else is a server-side failure with the description attached.
fn supervisor_error(err: SupervisorError) -> Response {
	let status = match &err {
		SupervisorError::UnknownProcess(_) => StatusCode::NOT_FOUND,
		e if e.is_conflict() => StatusCode::CONFLICT,
		_ => StatusCode::INTERNAL_SERVER_ERROR,
	};
	let logs = match &err {
		SupervisorError::ExitedImmediately { logs, .. } => Some(logs.clone()),
		_ => None,
	};
	(
		status,
		Json(ErrorResponse {
			error: err.to_string(),
			logs,
		}),
	)
		.into_response()
}

fn catalog_error(err: CatalogError) -> Response {
	let status = match &err {
		CatalogError::EmptyCommand(_) | CatalogError::Parse(_) => StatusCode::BAD_REQUEST,
		CatalogError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
	};
	(
		status,
		Json(ErrorResponse {
			error: err.to_string(),
			logs: None,
		}),
	)
		.into_response()
}

async fn list_processes(State(state): State<AppState>) -> Json<Vec<ProcessSnapshot>> {
	Json(state.supervisor.list_all().await)
}

async fn get_process(State(state): State<AppState>, Path(name): Path<String>) -> Response {
	match state.supervisor.get(&name).await {
		Ok(snapshot) => Json(snapshot).into_response(),
		Err(err) => supervisor_error(err),
	}
}

async fn start_process(State(state): State<AppState>, Path(name): Path<String>) -> Response {
	match state.supervisor.start(&name).await {
		Ok(snapshot) => Json(snapshot).into_response(),
		Err(err) => supervisor_error(err),
	}
}

async fn stop_process(State(state): State<AppState>, Path(name): Path<String>) -> Response {
	match state.supervisor.stop(&name).await {
		Ok(snapshot) => Json(snapshot).into_response(),
		Err(err) => supervisor_error(err),
	}
}

async fn process_status(State(state): State<AppState>, Path(name): Path<String>) -> Response {
	match state.supervisor.status(&name).await {
		Ok(status) => Json(status).into_response(),
		Err(err) => supervisor_error(err),
	}
}

async fn process_logs(State(state): State<AppState>, Path(name): Path<String>) -> Json<LogsResponse> {
	let (logs, unread_bytes) = state.supervisor.logs(&name).await;
	Json(LogsResponse { logs, unread_bytes })
}

/// Re-reads the catalog file and reconciles the managed set against it.
async fn reload_catalog(State(state): State<AppState>) -> Response {
	match Catalog::load(&state.catalog_path) {
		Ok(catalog) => {
			state.supervisor.reconcile(&catalog).await;
			Json(catalog).into_response()
		}
		Err(err) => catalog_error(err),
	}
}

/// Accepts an updated catalog, persists it, and reconciles against it.
async fn update_catalog(
	State(state): State<AppState>,
	Json(catalog): Json<Catalog>,
) -> Response {
	if let Err(err) = catalog.validate() {
		return catalog_error(err);
	}
	if let Err(err) = catalog.save(&state.catalog_path) {
		return catalog_error(err);
	}
	state.supervisor.reconcile(&catalog).await;
	Json(catalog).into_response()
}
