use std::time::Instant;

use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::{HeaderValue, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	trace::TraceLayer,
};

use juris_service::{Citation, QueryRequest, QueryResponse, QueryStatus};

use crate::state::AppState;

const WELCOME_MESSAGE: &str =
	"Welcome to the Juris case-law research API. POST /query to ask a question.";

/// Body of every `POST /query` answer, including pipeline failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryEnvelope {
	pub status: QueryStatus,
	pub trace_id: uuid::Uuid,
	pub data: QueryData,
	/// Seconds spent handling the request.
	pub processing_time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryData {
	pub answer: String,
	pub citations: Vec<Citation>,
	pub provider: Option<String>,
}

pub fn router(state: AppState) -> Router {
	let cors = cors_layer(&state.service.cfg.service.cors_origins);
	let router = Router::new()
		.route("/", get(root))
		.route("/health", get(health))
		.route("/query", post(query))
		.with_state(state);
	let router = match cors {
		Some(cors) => router.layer(cors),
		None => router,
	};

	router.layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
	let allowed: Vec<HeaderValue> = origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin) {
			Ok(value) => Some(value),
			Err(err) => {
				tracing::warn!(origin = %origin, error = %err, "Ignoring invalid CORS origin.");

				None
			},
		})
		.collect();

	if allowed.is_empty() {
		return None;
	}

	Some(
		CorsLayer::new()
			.allow_origin(AllowOrigin::list(allowed))
			.allow_methods(Any)
			.allow_headers(Any),
	)
}

async fn root() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "message": WELCOME_MESSAGE }))
}

async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "healthy" }))
}

/// Dropping this future on client disconnect cancels whichever external call is in flight.
async fn query(
	State(state): State<AppState>,
	payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryEnvelope>, ApiError> {
	let started = Instant::now();
	let Json(request) = payload?;
	let QueryResponse { trace_id, status, answer, citations, provider } =
		state.service.query(request).await;

	Ok(Json(QueryEnvelope {
		status,
		trace_id,
		data: QueryData { answer, citations, provider },
		processing_time: started.elapsed().as_secs_f64(),
	}))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

/// Transport-level failure: the request never reached the pipeline.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::new(rejection.status(), "INVALID_REQUEST", rejection.body_text())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
