use crate::api::{error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitescan_common::types::{
    security_grade, IssueCategory, Priority, ScanStatus, ScanStatusView, Severity,
};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScanRequest {
    /// Absolute http(s) URL of the page to scan
    pub url: String,
    /// Owner of the website
    pub user_id: String,
    /// Display name for the website; derived from the URL when omitted
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateScanResponse {
    pub scan_id: String,
    pub website_id: String,
    /// Job id in the queue (equals the scan id)
    pub job_id: String,
    pub status: ScanStatus,
}

fn derive_site_name(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

/// Submit a URL for scanning.
///
/// Creates the website on first use, records a pending scan, and
/// enqueues it. The returned job id equals the scan id.
#[utoipa::path(
    post,
    path = "/v1/scans",
    tag = "Scans",
    request_body = CreateScanRequest,
    responses(
        (status = 202, description = "Scan accepted", body = CreateScanResponse),
        (status = 400, description = "Invalid request", body = ApiError)
    )
)]
async fn create_scan(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateScanRequest>,
) -> impl IntoResponse {
    if req.user_id.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "user_id is required",
        );
    }
    if !req.url.starts_with("http://") && !req.url.starts_with("https://") {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "invalid_url",
            "url must be an absolute http(s) URL",
        );
    }

    let name = req
        .name
        .clone()
        .unwrap_or_else(|| derive_site_name(&req.url));
    let website = match state
        .store
        .get_or_create_website(&req.user_id, &req.url, &name)
        .await
    {
        Ok(site) => site,
        Err(e) => {
            tracing::error!(error = %e, url = %req.url, "Failed to resolve website");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let scan = match state.store.create_scan(&website.id).await {
        Ok(scan) => scan,
        Err(e) => {
            tracing::error!(error = %e, website_id = %website.id, "Failed to create scan");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let job_id = match state.queue.enqueue(&scan.id) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, scan_id = %scan.id, "Failed to enqueue scan");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "queue_error",
                "Scan could not be queued",
            );
        }
    };

    success_response(
        StatusCode::ACCEPTED,
        &trace_id,
        CreateScanResponse {
            scan_id: scan.id,
            website_id: website.id,
            job_id,
            status: scan.status,
        },
    )
}

/// Current status of a scan, merged from the database and the live
/// queue.
#[utoipa::path(
    get,
    path = "/v1/scans/{id}/status",
    tag = "Scans",
    params(("id" = String, Path, description = "Scan id")),
    responses(
        (status = 200, description = "Merged scan status", body = ScanStatusView),
        (status = 404, description = "Unknown scan id", body = ApiError)
    )
)]
async fn get_scan_status(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.reconciler.status(&id).await {
        Ok(Some(view)) => success_response(StatusCode::OK, &trace_id, view),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Scan not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, scan_id = %id, "Failed to reconcile scan status");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MetricResponse {
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct IssueResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Serialize, ToSchema)]
pub struct SectionResponse {
    /// Category score, absent until the scan has produced one
    pub score: Option<f64>,
    pub issues: Vec<IssueResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct SecuritySectionResponse {
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub issues: Vec<IssueResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct RecommendationResponse {
    pub issue_id: String,
    pub issue_title: String,
    pub description: String,
    pub priority: Priority,
    pub implementation_details: String,
    pub impact: i32,
    pub effort: i32,
    pub priority_score: f64,
}

#[derive(Serialize, ToSchema)]
pub struct ScanResultResponse {
    pub id: String,
    pub url: String,
    pub status: ScanStatus,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub performance: SectionResponse,
    pub accessibility: SectionResponse,
    pub seo: SectionResponse,
    pub best_practices: SectionResponse,
    pub security: SecuritySectionResponse,
    /// Page-speed measurements (First Contentful Paint etc.)
    pub metrics: Vec<MetricResponse>,
    /// Sorted descending by priority score
    pub recommendations: Vec<RecommendationResponse>,
}

/// Persisted result of a scan: per-category scores, issues, and fix
/// recommendations. Available with partial data while the scan is still
/// running.
#[utoipa::path(
    get,
    path = "/v1/scans/{id}/result",
    tag = "Scans",
    params(("id" = String, Path, description = "Scan id")),
    responses(
        (status = 200, description = "Scan result", body = ScanResultResponse),
        (status = 404, description = "Unknown scan id", body = ApiError)
    )
)]
async fn get_scan_result(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (scan, website) = match state.store.get_scan_with_website(&id).await {
        Ok(Some(pair)) => pair,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Scan not found",
            )
        }
        Err(e) => {
            tracing::error!(error = %e, scan_id = %id, "Failed to load scan");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let metrics = match state.store.list_metrics_for_scan(&scan.id).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, scan_id = %scan.id, "Failed to load metrics");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    let issues = match state.store.list_issues_for_scan(&scan.id).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, scan_id = %scan.id, "Failed to load issues");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    let issue_ids: Vec<String> = issues.iter().map(|i| i.id.clone()).collect();
    let recommendations = match state
        .store
        .list_recommendations_for_issues(&issue_ids)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, scan_id = %scan.id, "Failed to load recommendations");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let score_for = |category: IssueCategory| {
        metrics
            .iter()
            .find(|m| m.name == category.score_metric_name())
            .map(|m| m.value)
    };
    let issues_for = |category: IssueCategory| {
        issues
            .iter()
            .filter(|i| i.category == category)
            .map(|i| IssueResponse {
                id: i.id.clone(),
                title: i.title.clone(),
                description: i.description.clone(),
                severity: i.severity,
            })
            .collect::<Vec<_>>()
    };
    let section = |category: IssueCategory| SectionResponse {
        score: score_for(category),
        issues: issues_for(category),
    };

    let security_score = score_for(IssueCategory::Security);
    let mut recs: Vec<RecommendationResponse> = recommendations
        .into_iter()
        .map(|r| {
            let issue_title = issues
                .iter()
                .find(|i| i.id == r.issue_id)
                .map(|i| i.title.clone())
                .unwrap_or_default();
            RecommendationResponse {
                issue_id: r.issue_id,
                issue_title,
                description: r.description,
                priority: r.priority,
                implementation_details: r.implementation_details,
                impact: r.impact,
                effort: r.effort,
                priority_score: r.priority_score,
            }
        })
        .collect();
    recs.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Score rows are reported through the sections, not the metric list
    let measurements = metrics
        .iter()
        .filter(|m| m.name != m.category.score_metric_name())
        .map(|m| MetricResponse {
            name: m.name.clone(),
            value: m.value,
            unit: m.unit.clone(),
        })
        .collect();

    success_response(
        StatusCode::OK,
        &trace_id,
        ScanResultResponse {
            id: scan.id,
            url: website.url,
            status: scan.status,
            error: scan.error,
            completed_at: scan.completed_at,
            performance: section(IssueCategory::Performance),
            accessibility: section(IssueCategory::Accessibility),
            seo: section(IssueCategory::Seo),
            best_practices: section(IssueCategory::BestPractices),
            security: SecuritySectionResponse {
                score: security_score,
                grade: security_score.map(|s| security_grade(s).to_string()),
                issues: issues_for(IssueCategory::Security),
            },
            metrics: measurements,
            recommendations: recs,
        },
    )
}

pub fn scan_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_scan))
        .routes(routes!(get_scan_status))
        .routes(routes!(get_scan_result))
}
