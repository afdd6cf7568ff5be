pub mod alerts;
pub mod scans;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// API error response.
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub err_code: i32,
    /// Error message
    pub err_msg: String,
    /// Trace ID for log correlation
    pub trace_id: String,
}

/// Uniform API response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// Error code (0 on success)
    pub err_code: i32,
    /// Error message ("success" on success)
    pub err_msg: String,
    /// Trace ID for log correlation
    pub trace_id: String,
    /// Payload, present when the operation produced data
    pub data: Option<T>,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "invalid_url" => 1101,
        "queue_error" => 1201,
        "internal_error" => 1500,
        "storage_error" => 1501,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Health check response.
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// Service version
    version: String,
    /// Uptime in seconds
    uptime_secs: i64,
    /// Storage status
    storage_status: String,
}

/// Service health status.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status: "ok".to_string(),
        },
    )
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health))
}
