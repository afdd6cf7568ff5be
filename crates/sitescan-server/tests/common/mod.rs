#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::Value;
use sitescan_alert::AlertEvaluator;
use sitescan_audit::{AccessibilityAuditor, PageSpeedAuditor, SecurityAuditor};
use sitescan_common::types::{
    AccessibilityReport, AuditIssue, NamedMetric, PageSpeedReport, SecurityReport, Severity,
};
use sitescan_pipeline::{ScanJobHandler, ScanPipeline, StatusReconciler};
use sitescan_queue::{JobQueue, RetryPolicy};
use sitescan_server::app;
use sitescan_server::config::ServerConfig;
use sitescan_server::state::AppState;
use sitescan_storage::ScanStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

struct StubPageSpeed;

#[async_trait]
impl PageSpeedAuditor for StubPageSpeed {
    async fn audit(&self, _url: &str) -> Result<PageSpeedReport> {
        Ok(PageSpeedReport {
            performance_score: 85.0,
            seo_score: 88.0,
            best_practices_score: 90.0,
            metrics: vec![NamedMetric {
                name: "First Contentful Paint".to_string(),
                value: 1.8,
                unit: Some("s".to_string()),
            }],
            performance_issues: vec![AuditIssue {
                title: "Large images".to_string(),
                description: "Serve appropriately sized images".to_string(),
                severity: Severity::High,
            }],
            seo_issues: Vec::new(),
            best_practices_issues: Vec::new(),
        })
    }
}

struct StubAccessibility;

#[async_trait]
impl AccessibilityAuditor for StubAccessibility {
    async fn audit(&self, _url: &str) -> Result<AccessibilityReport> {
        Ok(AccessibilityReport {
            score: 92.0,
            issues: Vec::new(),
        })
    }
}

struct StubSecurity;

#[async_trait]
impl SecurityAuditor for StubSecurity {
    async fn audit(&self, _url: &str) -> Result<SecurityReport> {
        Ok(SecurityReport {
            score: 75.0,
            grade: "B".to_string(),
            issues: Vec::new(),
        })
    }
}

pub async fn build_test_context() -> Result<TestContext> {
    sitescan_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("sitescan.db").display()
    );
    let store = Arc::new(ScanStore::new(&db_url).await?);

    let evaluator = Arc::new(AlertEvaluator::new(store.clone(), Vec::new()));
    let pipeline = Arc::new(ScanPipeline::new(
        store.clone(),
        Arc::new(StubPageSpeed),
        Arc::new(StubAccessibility),
        Arc::new(StubSecurity),
        None,
        evaluator,
    ));
    let queue = Arc::new(JobQueue::new(RetryPolicy::new(
        3,
        Duration::from_millis(10),
    )));
    queue.start(Arc::new(ScanJobHandler::new(pipeline)), 2);
    let reconciler = Arc::new(StatusReconciler::new(store.clone(), queue.clone(), false));

    let config: ServerConfig = toml::from_str("")?;
    let state = AppState {
        store,
        queue,
        reconciler,
        start_time: Utc::now(),
        config: Arc::new(config),
    };
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    path: &str,
    payload: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match payload {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request should build"))
        .await
        .expect("request should not fail");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, json)
}

/// Polls the queue until the scan's job reaches a terminal state.
pub async fn wait_for_completion(ctx: &TestContext, scan_id: &str) {
    for _ in 0..250 {
        if ctx.state.queue.status(scan_id).state.is_terminal() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("scan {scan_id} did not settle");
}
