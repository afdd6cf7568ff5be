use crate::handler::ScanJobHandler;
use crate::pipeline::ScanPipeline;
use crate::priority::{priority_score, top_issues};
use crate::status::StatusReconciler;
use anyhow::Result;
use async_trait::async_trait;
use sitescan_ai::{FixRecommendation, RecommendationGenerator, RecommendationInput};
use sitescan_alert::{AlertEvaluator, AlertNotification, NotificationChannel};
use sitescan_audit::{AccessibilityAuditor, PageSpeedAuditor, SecurityAuditor};
use sitescan_common::types::{
    AccessibilityReport, AlertCondition, AuditIssue, IssueCategory, NamedMetric, PageSpeedReport,
    Priority, ScanStatus, SecurityReport, Severity,
};
use sitescan_queue::{JobQueue, JobState, ProgressHandle, RetryPolicy};
use sitescan_storage::{IssueRow, ScanStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn issue(title: &str, severity: Severity) -> AuditIssue {
    AuditIssue {
        title: title.to_string(),
        description: format!("{title} details"),
        severity,
    }
}

struct FixedPageSpeed;

#[async_trait]
impl PageSpeedAuditor for FixedPageSpeed {
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
            performance_issues: vec![issue("Large images", Severity::High)],
            seo_issues: vec![issue("Missing meta description", Severity::Medium)],
            best_practices_issues: Vec::new(),
        })
    }
}

struct FixedAccessibility;

#[async_trait]
impl AccessibilityAuditor for FixedAccessibility {
    async fn audit(&self, _url: &str) -> Result<AccessibilityReport> {
        Ok(AccessibilityReport {
            score: 92.0,
            issues: vec![issue("Low contrast text", Severity::Low)],
        })
    }
}

struct FailingAccessibility;

#[async_trait]
impl AccessibilityAuditor for FailingAccessibility {
    async fn audit(&self, _url: &str) -> Result<AccessibilityReport> {
        anyhow::bail!("axe runner crashed")
    }
}

/// Reports more issues than the recommendation cap.
struct NoisyAccessibility;

#[async_trait]
impl AccessibilityAuditor for NoisyAccessibility {
    async fn audit(&self, _url: &str) -> Result<AccessibilityReport> {
        let issues = (0..12)
            .map(|i| issue(&format!("Unlabeled control {i}"), Severity::Low))
            .collect();
        Ok(AccessibilityReport {
            score: 40.0,
            issues,
        })
    }
}

struct FixedSecurity;

#[async_trait]
impl SecurityAuditor for FixedSecurity {
    async fn audit(&self, _url: &str) -> Result<SecurityReport> {
        Ok(SecurityReport {
            score: 75.0,
            grade: "B".to_string(),
            issues: vec![issue("Missing CSP header", Severity::Medium)],
        })
    }
}

struct FixedGenerator;

#[async_trait]
impl RecommendationGenerator for FixedGenerator {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, input: &RecommendationInput) -> Result<FixRecommendation> {
        let (priority, impact, effort) = match input.severity {
            Severity::High => (Priority::Critical, 8, 3),
            Severity::Medium => (Priority::Medium, 5, 5),
            Severity::Low => (Priority::Low, 2, 4),
        };
        Ok(FixRecommendation {
            description: format!("Fix {}", input.issue_title),
            priority,
            implementation_details: "Apply the documented remediation.".to_string(),
            impact,
            effort,
        })
    }
}

/// Fails for any issue whose title mentions "meta".
struct PickyGenerator;

#[async_trait]
impl RecommendationGenerator for PickyGenerator {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "picky"
    }

    async fn generate(&self, input: &RecommendationInput) -> Result<FixRecommendation> {
        if input.issue_title.contains("meta") {
            anyhow::bail!("model returned malformed JSON");
        }
        FixedGenerator.generate(input).await
    }
}

struct FailingChannel;

#[async_trait]
impl NotificationChannel for FailingChannel {
    async fn send(&self, _notice: &AlertNotification) -> Result<()> {
        anyhow::bail!("gateway unreachable")
    }

    fn channel_name(&self) -> &str {
        "failing"
    }
}

struct NoopHandler;

#[async_trait]
impl sitescan_queue::JobHandler for NoopHandler {
    async fn handle(&self, _scan_id: &str, _progress: ProgressHandle) -> Result<()> {
        Ok(())
    }
}

async fn setup_store() -> (TempDir, Arc<ScanStore>) {
    sitescan_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("sitescan.db").display()
    );
    let store = Arc::new(ScanStore::new(&url).await.unwrap());
    (dir, store)
}

async fn seed_scan(store: &ScanStore, user: &str) -> (String, String) {
    let site = store
        .get_or_create_website(user, "https://example.com", "example.com")
        .await
        .unwrap();
    let scan = store.create_scan(&site.id).await.unwrap();
    (site.id, scan.id)
}

fn pipeline(
    store: &Arc<ScanStore>,
    accessibility: Arc<dyn AccessibilityAuditor>,
    generator: Option<Arc<dyn RecommendationGenerator>>,
) -> ScanPipeline {
    ScanPipeline::new(
        store.clone(),
        Arc::new(FixedPageSpeed),
        accessibility,
        Arc::new(FixedSecurity),
        generator,
        Arc::new(AlertEvaluator::new(store.clone(), Vec::new())),
    )
}

async fn wait_terminal(queue: &JobQueue, job_id: &str) -> JobState {
    for _ in 0..250 {
        let status = queue.status(job_id);
        if status.state.is_terminal() {
            return status.state;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not settle");
}

#[test]
fn priority_score_weighs_impact_effort_and_priority() {
    assert_eq!(priority_score(8, 3, Priority::Critical), 53.33);
    assert_eq!(priority_score(5, 5, Priority::Medium), 10.0);
    assert_eq!(priority_score(9, 2, Priority::High), 67.5);
    // Zero effort is clamped to 1
    assert_eq!(priority_score(4, 0, Priority::Low), 20.0);
}

#[test]
fn top_issues_ranks_high_severity_first_and_caps() {
    fn row(id: &str, severity: Severity) -> IssueRow {
        IssueRow {
            id: id.to_string(),
            scan_id: "scan".to_string(),
            title: id.to_string(),
            description: String::new(),
            severity,
            category: IssueCategory::Performance,
            created_at: chrono::Utc::now(),
        }
    }

    let rows = vec![
        row("low-a", Severity::Low),
        row("high-a", Severity::High),
        row("med-a", Severity::Medium),
        row("high-b", Severity::High),
    ];
    let top = top_issues(rows, 3);
    let ids: Vec<&str> = top.iter().map(|i| i.id.as_str()).collect();
    // Stable: high-a keeps its position ahead of high-b
    assert_eq!(ids, vec!["high-a", "high-b", "med-a"]);
}

#[tokio::test]
async fn scan_completes_and_persists_scores() {
    let (_dir, store) = setup_store().await;
    let (_site, scan_id) = seed_scan(&store, "user-1").await;

    let p = pipeline(&store, Arc::new(FixedAccessibility), None);
    let result = p.run(&scan_id).await;

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.url, "https://example.com");
    assert_eq!(result.performance.score, 85.0);
    assert_eq!(result.accessibility.score, 92.0);
    assert_eq!(result.seo.score, 88.0);
    assert_eq!(result.best_practices.score, 90.0);
    assert_eq!(result.security.score, 75.0);
    assert_eq!(result.security.grade, "B");

    let scan = store.get_scan_by_id(&scan_id).await.unwrap().unwrap();
    assert_eq!(scan.status, ScanStatus::Completed);
    assert!(scan.completed_at.is_some());

    let metrics = store.list_metrics_for_scan(&scan_id).await.unwrap();
    let value = |name: &str| metrics.iter().find(|m| m.name == name).map(|m| m.value);
    assert_eq!(value("Performance Score"), Some(85.0));
    assert_eq!(value("Accessibility Score"), Some(92.0));
    assert_eq!(value("SEO Score"), Some(88.0));
    assert_eq!(value("Best Practices Score"), Some(90.0));
    assert_eq!(value("Security Score"), Some(75.0));
    assert_eq!(value("First Contentful Paint"), Some(1.8));

    let issues = store.list_issues_for_scan(&scan_id).await.unwrap();
    assert_eq!(issues.len(), 4);
}

#[tokio::test]
async fn failed_audit_substitutes_degraded_result() {
    let (_dir, store) = setup_store().await;
    let (_site, scan_id) = seed_scan(&store, "user-1").await;

    let p = pipeline(&store, Arc::new(FailingAccessibility), None);
    let result = p.run(&scan_id).await;

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.accessibility.score, 50.0);
    assert_eq!(result.accessibility.issues.len(), 1);
    assert_eq!(result.accessibility.issues[0].severity, Severity::Medium);
    assert!(result.accessibility.issues[0]
        .description
        .contains("axe runner crashed"));
    // Sibling audits are unaffected
    assert_eq!(result.performance.score, 85.0);
    assert_eq!(result.security.score, 75.0);

    let scan = store.get_scan_by_id(&scan_id).await.unwrap().unwrap();
    assert_eq!(scan.status, ScanStatus::Completed);
}

#[tokio::test]
async fn unknown_scan_reports_failure_shaped_result() {
    let (_dir, store) = setup_store().await;
    let p = pipeline(&store, Arc::new(FixedAccessibility), None);

    let result = p.run("does-not-exist").await;
    assert_eq!(result.status, ScanStatus::Failed);
    assert!(result
        .error
        .unwrap()
        .starts_with("Failed to get scan"));
}

#[tokio::test]
async fn rerun_converges_instead_of_duplicating_artifacts() {
    let (_dir, store) = setup_store().await;
    let (_site, scan_id) = seed_scan(&store, "user-1").await;

    // Artifacts left behind by an attempt that died before finishing
    store
        .insert_metrics(
            &scan_id,
            &[sitescan_storage::NewMetric {
                name: "Performance Score".to_string(),
                value: 12.0,
                unit: None,
                category: IssueCategory::Performance,
            }],
        )
        .await
        .unwrap();
    store
        .insert_issues(
            &scan_id,
            &[sitescan_storage::NewIssue {
                title: "Stale issue".to_string(),
                description: String::new(),
                severity: Severity::Low,
                category: IssueCategory::Performance,
            }],
        )
        .await
        .unwrap();

    let p = pipeline(&store, Arc::new(FixedAccessibility), None);
    let result = p.run(&scan_id).await;
    assert_eq!(result.status, ScanStatus::Completed);

    let metrics = store.list_metrics_for_scan(&scan_id).await.unwrap();
    assert_eq!(metrics.len(), 6);
    let perf: Vec<f64> = metrics
        .iter()
        .filter(|m| m.name == "Performance Score")
        .map(|m| m.value)
        .collect();
    assert_eq!(perf, vec![85.0]);

    let issues = store.list_issues_for_scan(&scan_id).await.unwrap();
    assert_eq!(issues.len(), 4);
    assert!(issues.iter().all(|i| i.title != "Stale issue"));
}

#[tokio::test]
async fn recommendations_require_active_premium_plan() {
    let (_dir, store) = setup_store().await;
    store
        .create_subscription("pro-user", "business", "active")
        .await
        .unwrap();
    let (_s1, scan_free) = seed_scan(&store, "free-user").await;
    let (_s2, scan_pro) = seed_scan(&store, "pro-user").await;

    let p = pipeline(
        &store,
        Arc::new(FixedAccessibility),
        Some(Arc::new(FixedGenerator)),
    );

    let free = p.run(&scan_free).await;
    assert!(free.recommendations.is_empty());

    let pro = p.run(&scan_pro).await;
    assert_eq!(pro.recommendations.len(), 4);
    // Sorted descending by score; the critical fix for the high-severity
    // issue leads
    assert_eq!(pro.recommendations[0].issue_title, "Large images");
    assert_eq!(pro.recommendations[0].priority_score, 53.33);
    for pair in pro.recommendations.windows(2) {
        assert!(pair[0].priority_score >= pair[1].priority_score);
    }

    let issues = store.list_issues_for_scan(&scan_pro).await.unwrap();
    let ids: Vec<String> = issues.iter().map(|i| i.id.clone()).collect();
    let stored = store.list_recommendations_for_issues(&ids).await.unwrap();
    assert_eq!(stored.len(), 4);
}

#[tokio::test]
async fn generator_failure_skips_issue_and_keeps_rest() {
    let (_dir, store) = setup_store().await;
    store
        .create_subscription("pro-user", "premium", "active")
        .await
        .unwrap();
    let (_site, scan_id) = seed_scan(&store, "pro-user").await;

    let p = pipeline(
        &store,
        Arc::new(FixedAccessibility),
        Some(Arc::new(PickyGenerator)),
    );
    let result = p.run(&scan_id).await;

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.recommendations.len(), 3);
    assert!(result
        .recommendations
        .iter()
        .all(|r| !r.issue_title.contains("meta")));
}

#[tokio::test]
async fn recommendations_cap_at_highest_severity_issues() {
    let (_dir, store) = setup_store().await;
    store
        .create_subscription("pro-user", "premium", "active")
        .await
        .unwrap();
    let (_site, scan_id) = seed_scan(&store, "pro-user").await;

    // 15 issues total: 1 high, 2 medium, 12 low
    let p = pipeline(
        &store,
        Arc::new(NoisyAccessibility),
        Some(Arc::new(FixedGenerator)),
    );
    let result = p.run(&scan_id).await;

    assert_eq!(result.recommendations.len(), 10);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.issue_title == "Large images"));
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.issue_title == "Missing CSP header"));
}

#[tokio::test]
async fn alert_dispatch_failure_does_not_affect_scan_status() {
    let (_dir, store) = setup_store().await;
    let (site_id, scan_id) = seed_scan(&store, "user-1").await;
    store
        .create_alert(
            "user-1",
            &site_id,
            "Performance Score",
            90.0,
            AlertCondition::Below,
        )
        .await
        .unwrap();

    let evaluator = Arc::new(AlertEvaluator::new(
        store.clone(),
        vec![Box::new(FailingChannel)],
    ));
    let p = ScanPipeline::new(
        store.clone(),
        Arc::new(FixedPageSpeed),
        Arc::new(FixedAccessibility),
        Arc::new(FixedSecurity),
        None,
        evaluator,
    );
    let result = p.run(&scan_id).await;
    assert_eq!(result.status, ScanStatus::Completed);

    // The trigger was recorded; delivery alone failed
    let triggers = store.list_triggers_for_scan(&scan_id).await.unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].metric_value, 85.0);
    assert!(!triggers[0].notification_sent);
}

#[tokio::test]
async fn queued_scan_runs_through_handler() {
    let (_dir, store) = setup_store().await;
    let (_site, scan_id) = seed_scan(&store, "user-1").await;

    let p = Arc::new(pipeline(&store, Arc::new(FixedAccessibility), None));
    let queue = Arc::new(JobQueue::new(RetryPolicy::new(
        3,
        Duration::from_millis(10),
    )));
    queue.start(Arc::new(ScanJobHandler::new(p)), 2);
    queue.enqueue(&scan_id).unwrap();

    assert_eq!(wait_terminal(&queue, &scan_id).await, JobState::Completed);
    assert_eq!(queue.status(&scan_id).progress, 100);

    let scan = store.get_scan_by_id(&scan_id).await.unwrap().unwrap();
    assert_eq!(scan.status, ScanStatus::Completed);
    queue.shutdown().await;
}

#[tokio::test]
async fn handler_surfaces_pipeline_failure_to_queue() {
    let (_dir, store) = setup_store().await;
    let p = Arc::new(pipeline(&store, Arc::new(FixedAccessibility), None));
    let queue = Arc::new(JobQueue::new(RetryPolicy::new(
        2,
        Duration::from_millis(10),
    )));
    queue.start(Arc::new(ScanJobHandler::new(p)), 1);
    // No scan row exists for this id
    queue.enqueue("ghost-scan").unwrap();

    assert_eq!(wait_terminal(&queue, "ghost-scan").await, JobState::Failed);
    let status = queue.status("ghost-scan");
    assert!(status.error.unwrap().starts_with("Failed to get scan"));
    queue.shutdown().await;
}

#[tokio::test]
async fn reconciler_maps_completed_job_onto_pending_scan() {
    let (_dir, store) = setup_store().await;
    let (_site, scan_id) = seed_scan(&store, "user-1").await;

    let queue = Arc::new(JobQueue::new(RetryPolicy::default()));
    queue.start(Arc::new(NoopHandler), 1);
    queue.enqueue(&scan_id).unwrap();
    wait_terminal(&queue, &scan_id).await;

    // The no-op handler never touched the scan row
    let before = store.get_scan_by_id(&scan_id).await.unwrap().unwrap();
    assert_eq!(before.status, ScanStatus::Pending);

    let reconciler = StatusReconciler::new(store.clone(), queue.clone(), false);
    let view = reconciler.status(&scan_id).await.unwrap().unwrap();
    assert_eq!(view.status, ScanStatus::Completed);
    assert_eq!(view.progress, 100);
    assert!(view.completed_at.is_some());

    let after = store.get_scan_by_id(&scan_id).await.unwrap().unwrap();
    assert_eq!(after.status, ScanStatus::Completed);
    queue.shutdown().await;
}

#[tokio::test]
async fn reconciler_trusts_terminal_scan_without_consulting_queue() {
    let (_dir, store) = setup_store().await;
    let (_site, scan_id) = seed_scan(&store, "user-1").await;
    store
        .update_scan_status(&scan_id, ScanStatus::InProgress, None)
        .await
        .unwrap();
    store
        .update_scan_status(&scan_id, ScanStatus::Completed, None)
        .await
        .unwrap();

    // Empty queue: consulting it would report the job as failed
    let queue = Arc::new(JobQueue::new(RetryPolicy::default()));
    let reconciler = StatusReconciler::new(store.clone(), queue, false);
    let view = reconciler.status(&scan_id).await.unwrap().unwrap();
    assert_eq!(view.status, ScanStatus::Completed);
    assert_eq!(view.progress, 100);
}

#[tokio::test]
async fn reconciler_fails_pending_scan_the_queue_has_forgotten() {
    let (_dir, store) = setup_store().await;
    let (_site, scan_id) = seed_scan(&store, "user-1").await;

    let queue = Arc::new(JobQueue::new(RetryPolicy::default()));
    let reconciler = StatusReconciler::new(store.clone(), queue, false);
    let view = reconciler.status(&scan_id).await.unwrap().unwrap();
    assert_eq!(view.status, ScanStatus::Failed);
    assert_eq!(view.error.as_deref(), Some("Job not found"));

    let scan = store.get_scan_by_id(&scan_id).await.unwrap().unwrap();
    assert_eq!(scan.status, ScanStatus::Failed);
}

#[tokio::test]
async fn reconciler_handles_unknown_scan_ids() {
    let (_dir, store) = setup_store().await;
    let queue = Arc::new(JobQueue::new(RetryPolicy::default()));

    let live = StatusReconciler::new(store.clone(), queue.clone(), false);
    assert!(live.status("missing").await.unwrap().is_none());

    let test_env = StatusReconciler::new(store.clone(), queue, true);
    let view = test_env.status("missing").await.unwrap().unwrap();
    assert_eq!(view.status, ScanStatus::Completed);
    assert_eq!(view.progress, 100);
    assert!(view.completed_at.is_some());
}
