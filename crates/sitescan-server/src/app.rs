use crate::state::AppState;
use crate::{api, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "sitescan API",
        description = "Website quality scan REST API",
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Scans", description = "Scan submission, status, and results"),
        (name = "Alerts", description = "Metric alert definitions")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (public_router, public_spec) = api::public_routes().split_for_parts();
    let (scan_router, scan_spec) = api::scans::scan_routes().split_for_parts();
    let (alert_router, alert_spec) = api::alerts::alert_routes().split_for_parts();

    let mut spec = ApiDoc::openapi();
    spec.merge(public_spec);
    spec.merge(scan_spec);
    spec.merge(alert_spec);

    let cors = if state.config.cors_allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    public_router
        .merge(scan_router)
        .merge(alert_router)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
