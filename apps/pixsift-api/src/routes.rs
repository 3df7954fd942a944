use axum::{
	Json, Router,
	extract::{Query, State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pixsift_domain::{candidate::ImageDescriptor, query::QueryRejectReason};
use pixsift_service::{DebugSearchResponse, Error as ServiceError, SearchOutcome, SearchRequest};

use crate::state::AppState;

const DEFAULT_DEBUG_QUERY: &str = "dog";

pub fn router(state: AppState) -> Router {
	let mut router = Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/images", post(register_image));

	if state.service.cfg.service.debug_routes {
		router = router.route("/v1/debug/search", get(debug_search));
	}

	router.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DebugSearchQuery {
	q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageAccepted {
	pub job_id: Uuid,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	payload: Result<Json<SearchRequest>, JsonRejection>,
) -> (StatusCode, Json<SearchOutcome>) {
	// A missing or non-string query is an input error like a blank one.
	let Ok(Json(payload)) = payload else {
		let error = QueryRejectReason::Empty.message();

		return (StatusCode::BAD_REQUEST, Json(SearchOutcome::Error { error }));
	};
	let result = state.service.search_images(&payload.query).await;
	let status = match &result {
		Ok(_) => StatusCode::OK,
		Err(err) => status_for(err),
	};

	(status, Json(SearchOutcome::from_result(result, payload.diagnostics)))
}

async fn debug_search(
	State(state): State<AppState>,
	Query(params): Query<DebugSearchQuery>,
) -> Result<Json<DebugSearchResponse>, ApiError> {
	let query = params.q.unwrap_or_else(|| DEFAULT_DEBUG_QUERY.to_string());
	let response = state.service.debug_search(&query).await?;

	Ok(Json(response))
}

async fn register_image(
	State(state): State<AppState>,
	payload: Result<Json<ImageDescriptor>, JsonRejection>,
) -> Result<(StatusCode, Json<ImageAccepted>), ApiError> {
	let Json(image) = payload.map_err(|rejection| {
		json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
	})?;

	if image.url.trim().is_empty() {
		return Err(json_error(StatusCode::BAD_REQUEST, "invalid_request", "url must be non-empty."));
	}

	let job_id = state.captions.enqueue(image)?;

	Ok((StatusCode::ACCEPTED, Json(ImageAccepted { job_id })))
}

fn status_for(err: &ServiceError) -> StatusCode {
	match err {
		ServiceError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
		ServiceError::Retrieval { .. } => StatusCode::BAD_GATEWAY,
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let code = match err {
			ServiceError::InvalidQuery { .. } => "invalid_request",
			ServiceError::Retrieval { .. } => "upstream_error",
		};

		json_error(status_for(&err), code, err.to_string())
	}
}
impl From<pixsift_worker::Error> for ApiError {
	fn from(err: pixsift_worker::Error) -> Self {
		match err {
			pixsift_worker::Error::QueueFull { .. } | pixsift_worker::Error::QueueClosed =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "queue_unavailable", err.to_string()),
			other => {
				tracing::error!(error = %other, "Caption queue rejected an image.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal error.")
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}
