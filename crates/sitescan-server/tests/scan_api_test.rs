mod common;

use axum::http::StatusCode;
use common::{build_test_context, request_json, wait_for_completion};
use serde_json::json;

#[tokio::test]
async fn health_returns_ok() {
    let ctx = build_test_context().await.expect("test context");

    let (status, body) = request_json(&ctx.app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["err_code"], 0);
    assert_eq!(body["data"]["storage_status"], "ok");
}

#[tokio::test]
async fn scan_lifecycle_over_http() {
    let ctx = build_test_context().await.expect("test context");

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/scans",
        Some(json!({ "url": "https://example.com", "user_id": "user-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["err_code"], 0);
    let scan_id = body["data"]["scan_id"]
        .as_str()
        .expect("scan_id")
        .to_string();
    assert_eq!(body["data"]["job_id"], scan_id.as_str());
    assert_eq!(body["data"]["status"], "pending");

    wait_for_completion(&ctx, &scan_id).await;

    let (status, body) =
        request_json(&ctx.app, "GET", &format!("/v1/scans/{scan_id}/status"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["progress"], 100);

    let (status, body) =
        request_json(&ctx.app, "GET", &format!("/v1/scans/{scan_id}/result"), None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "completed");
    assert_eq!(data["url"], "https://example.com");
    assert_eq!(data["performance"]["score"], 85.0);
    assert_eq!(data["accessibility"]["score"], 92.0);
    assert_eq!(data["seo"]["score"], 88.0);
    assert_eq!(data["best_practices"]["score"], 90.0);
    assert_eq!(data["security"]["score"], 75.0);
    assert_eq!(data["security"]["grade"], "B");
    assert_eq!(data["metrics"][0]["name"], "First Contentful Paint");
    assert_eq!(
        data["performance"]["issues"][0]["title"],
        "Large images"
    );
}

#[tokio::test]
async fn invalid_scan_requests_are_rejected() {
    let ctx = build_test_context().await.expect("test context");

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/scans",
        Some(json!({ "url": "ftp://example.com", "user_id": "user-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1101);

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/scans",
        Some(json!({ "url": "https://example.com", "user_id": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1001);
}

#[tokio::test]
async fn unknown_scan_id_returns_404() {
    let ctx = build_test_context().await.expect("test context");

    let (status, body) =
        request_json(&ctx.app, "GET", "/v1/scans/nope/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["err_code"], 1004);

    let (status, body) =
        request_json(&ctx.app, "GET", "/v1/scans/nope/result", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["err_code"], 1004);
}

#[tokio::test]
async fn alerts_can_be_created_and_listed() {
    let ctx = build_test_context().await.expect("test context");

    let (_, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/scans",
        Some(json!({ "url": "https://example.com", "user_id": "user-1" })),
    )
    .await;
    let website_id = body["data"]["website_id"]
        .as_str()
        .expect("website_id")
        .to_string();

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "user_id": "user-1",
            "website_id": website_id,
            "metric_name": "Performance Score",
            "threshold": 50.0,
            "condition": "below"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["metric_name"], "Performance Score");
    assert_eq!(body["data"]["condition"], "below");
    assert_eq!(body["data"]["is_active"], true);

    // Another user cannot attach alerts to this website
    let (status, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/alerts",
        Some(json!({
            "user_id": "user-2",
            "website_id": website_id,
            "metric_name": "Performance Score",
            "threshold": 50.0,
            "condition": "below"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        request_json(&ctx.app, "GET", "/v1/alerts?user_id=user-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().expect("alert list").len(), 1);
}
