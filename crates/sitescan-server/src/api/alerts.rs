use crate::api::{error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitescan_common::types::AlertCondition;
use sitescan_storage::AlertRow;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAlertRequest {
    pub user_id: String,
    pub website_id: String,
    /// Metric the alert watches, e.g. `"Performance Score"`
    pub metric_name: String,
    pub threshold: f64,
    pub condition: AlertCondition,
}

#[derive(Serialize, ToSchema)]
pub struct AlertResponse {
    pub id: String,
    pub user_id: String,
    pub website_id: String,
    pub metric_name: String,
    pub threshold: f64,
    pub condition: AlertCondition,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AlertRow> for AlertResponse {
    fn from(row: AlertRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            website_id: row.website_id,
            metric_name: row.metric_name,
            threshold: row.threshold,
            condition: row.condition,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Create an alert definition for a website metric.
#[utoipa::path(
    post,
    path = "/v1/alerts",
    tag = "Alerts",
    request_body = CreateAlertRequest,
    responses(
        (status = 201, description = "Alert created", body = AlertResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Unknown website", body = ApiError)
    )
)]
async fn create_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateAlertRequest>,
) -> impl IntoResponse {
    if req.user_id.trim().is_empty() || req.metric_name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "user_id and metric_name are required",
        );
    }

    match state.store.get_website_by_id(&req.website_id).await {
        Ok(Some(site)) if site.user_id == req.user_id => {}
        Ok(_) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Website not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, website_id = %req.website_id, "Failed to load website");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    }

    match state
        .store
        .create_alert(
            &req.user_id,
            &req.website_id,
            &req.metric_name,
            req.threshold,
            req.condition,
        )
        .await
    {
        Ok(row) => success_response(
            StatusCode::CREATED,
            &trace_id,
            AlertResponse::from(row),
        ),
        Err(e) => {
            tracing::error!(error = %e, website_id = %req.website_id, "Failed to create alert");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct ListAlertsParams {
    /// Owner whose alert definitions to list
    user_id: String,
}

/// List a user's alert definitions, newest first.
#[utoipa::path(
    get,
    path = "/v1/alerts",
    tag = "Alerts",
    params(ListAlertsParams),
    responses(
        (status = 200, description = "Alert definitions", body = Vec<AlertResponse>)
    )
)]
async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListAlertsParams>,
) -> impl IntoResponse {
    match state.store.list_alerts_for_user(&params.user_id).await {
        Ok(rows) => {
            let alerts: Vec<AlertResponse> = rows.into_iter().map(AlertResponse::from).collect();
            success_response(StatusCode::OK, &trace_id, alerts)
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %params.user_id, "Failed to list alerts");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(create_alert, list_alerts))
}
