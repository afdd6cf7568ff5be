use crate::priority::{priority_score, top_issues};
use anyhow::Result;
use sitescan_ai::{RecommendationGenerator, RecommendationInput};
use sitescan_alert::AlertEvaluator;
use sitescan_audit::{fallback, AccessibilityAuditor, PageSpeedAuditor, SecurityAuditor};
use sitescan_common::types::{
    security_grade, AuditSection, IssueCategory, ScanResult, ScanStatus, SecuritySection,
};
use sitescan_storage::{
    IssueRow, NewIssue, NewMetric, NewRecommendation, ScanRow, ScanStore, WebsiteRow,
};
use std::sync::Arc;

/// Number of issues handed to the recommendation generator per scan.
const MAX_RECOMMENDED_ISSUES: usize = 10;

/// Orchestrates one scan: audits, aggregation, persistence,
/// recommendations, alerts.
///
/// The pipeline never returns an error from [`run`](Self::run); failures
/// are folded into a failure-shaped [`ScanResult`] and, where possible,
/// recorded on the scan row. Audit collaborator failures are contained by
/// substituting the fixed degraded result for that category only.
pub struct ScanPipeline {
    store: Arc<ScanStore>,
    page_speed: Arc<dyn PageSpeedAuditor>,
    accessibility: Arc<dyn AccessibilityAuditor>,
    security: Arc<dyn SecurityAuditor>,
    /// `None` disables recommendations entirely (no API key configured).
    generator: Option<Arc<dyn RecommendationGenerator>>,
    evaluator: Arc<AlertEvaluator>,
}

impl ScanPipeline {
    pub fn new(
        store: Arc<ScanStore>,
        page_speed: Arc<dyn PageSpeedAuditor>,
        accessibility: Arc<dyn AccessibilityAuditor>,
        security: Arc<dyn SecurityAuditor>,
        generator: Option<Arc<dyn RecommendationGenerator>>,
        evaluator: Arc<AlertEvaluator>,
    ) -> Self {
        Self {
            store,
            page_speed,
            accessibility,
            security,
            generator,
            evaluator,
        }
    }

    /// Runs the full pipeline for a scan.
    pub async fn run(&self, scan_id: &str) -> ScanResult {
        self.run_with_progress(scan_id, |_| {}).await
    }

    /// Like [`run`](Self::run), reporting coarse 0-100 progress through
    /// `report` as stages finish.
    pub async fn run_with_progress(
        &self,
        scan_id: &str,
        report: impl Fn(u8) + Send + Sync,
    ) -> ScanResult {
        let (scan, website) = match self.store.get_scan_with_website(scan_id).await {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                tracing::error!(scan_id, "Scan not found");
                return ScanResult::failed(scan_id, "", "Failed to get scan: scan not found");
            }
            Err(e) => {
                tracing::error!(scan_id, error = %e, "Failed to load scan");
                return ScanResult::failed(scan_id, "", format!("Failed to get scan: {e}"));
            }
        };

        match self.execute(&scan, &website, &report).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(scan_id, url = %website.url, error = %e, "Scan pipeline failed");
                if let Err(update_err) = self
                    .store
                    .update_scan_status(scan_id, ScanStatus::Failed, Some(&e.to_string()))
                    .await
                {
                    tracing::error!(scan_id, error = %update_err, "Failed to mark scan as failed");
                }
                ScanResult::failed(scan_id, website.url, e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        scan: &ScanRow,
        website: &WebsiteRow,
        report: &(impl Fn(u8) + Send + Sync),
    ) -> Result<ScanResult> {
        let scan_id = scan.id.as_str();
        let url = website.url.clone();
        tracing::info!(scan_id, url = %url, "Starting scan");

        self.store
            .update_scan_status(scan_id, ScanStatus::InProgress, None)
            .await?;
        report(10);

        // Leftovers from a previous attempt of the same scan
        if let Err(e) = self.store.delete_metrics_for_scan(scan_id).await {
            tracing::warn!(scan_id, error = %e, "Failed to clear previous metrics");
        }
        if let Err(e) = self.store.delete_issues_for_scan(scan_id).await {
            tracing::warn!(scan_id, error = %e, "Failed to clear previous issues");
        }

        // Fan out the three audits as sibling tasks
        let ps_task = tokio::spawn({
            let auditor = self.page_speed.clone();
            let url = url.clone();
            async move { auditor.audit(&url).await }
        });
        let ax_task = tokio::spawn({
            let auditor = self.accessibility.clone();
            let url = url.clone();
            async move { auditor.audit(&url).await }
        });
        let sec_task = tokio::spawn({
            let auditor = self.security.clone();
            let url = url.clone();
            async move { auditor.audit(&url).await }
        });
        let (ps, ax, sec) = tokio::join!(ps_task, ax_task, sec_task);

        let page_speed = match flatten(ps) {
            Ok(r) => r,
            Err(reason) => {
                tracing::warn!(scan_id, error = %reason, "Page speed audit failed, substituting fallback");
                fallback::page_speed(&reason)
            }
        };
        let accessibility = match flatten(ax) {
            Ok(r) => r,
            Err(reason) => {
                tracing::warn!(scan_id, error = %reason, "Accessibility audit failed, substituting fallback");
                fallback::accessibility(&reason)
            }
        };
        let security = match flatten(sec) {
            Ok(r) => r,
            Err(reason) => {
                tracing::warn!(scan_id, error = %reason, "Security audit failed, substituting fallback");
                fallback::security(&reason)
            }
        };
        report(60);

        let mut result = ScanResult {
            id: scan.id.clone(),
            url: url.clone(),
            status: ScanStatus::Completed,
            error: None,
            performance: AuditSection {
                score: page_speed.performance_score,
                issues: page_speed.performance_issues.clone(),
            },
            seo: AuditSection {
                score: page_speed.seo_score,
                issues: page_speed.seo_issues.clone(),
            },
            best_practices: AuditSection {
                score: page_speed.best_practices_score,
                issues: page_speed.best_practices_issues.clone(),
            },
            accessibility: AuditSection {
                score: accessibility.score,
                issues: accessibility.issues.clone(),
            },
            security: SecuritySection {
                score: security.score,
                grade: security_grade(security.score).to_string(),
                issues: security.issues.clone(),
            },
            recommendations: Vec::new(),
        };

        // Persistence is best-effort: a storage hiccup here degrades the
        // stored artifacts, not the scan itself.
        let mut metrics: Vec<NewMetric> = page_speed
            .metrics
            .iter()
            .map(|m| NewMetric {
                name: m.name.clone(),
                value: m.value,
                unit: m.unit.clone(),
                category: IssueCategory::Performance,
            })
            .collect();
        for (category, score) in [
            (IssueCategory::Performance, result.performance.score),
            (IssueCategory::Accessibility, result.accessibility.score),
            (IssueCategory::Seo, result.seo.score),
            (IssueCategory::BestPractices, result.best_practices.score),
            (IssueCategory::Security, result.security.score),
        ] {
            metrics.push(NewMetric {
                name: category.score_metric_name().to_string(),
                value: score,
                unit: None,
                category,
            });
        }
        if let Err(e) = self.store.insert_metrics(scan_id, &metrics).await {
            tracing::error!(scan_id, error = %e, "Failed to persist metrics");
        }

        let mut new_issues = Vec::new();
        for (category, issues) in [
            (IssueCategory::Performance, &result.performance.issues),
            (IssueCategory::Accessibility, &result.accessibility.issues),
            (IssueCategory::Seo, &result.seo.issues),
            (IssueCategory::BestPractices, &result.best_practices.issues),
            (IssueCategory::Security, &result.security.issues),
        ] {
            for issue in issues {
                new_issues.push(NewIssue {
                    title: issue.title.clone(),
                    description: issue.description.clone(),
                    severity: issue.severity,
                    category,
                });
            }
        }
        let stored_issues = match self.store.insert_issues(scan_id, &new_issues).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(scan_id, error = %e, "Failed to persist issues");
                Vec::new()
            }
        };
        report(70);

        result.recommendations = self
            .recommend(scan_id, &url, &website.user_id, stored_issues)
            .await;
        report(90);

        self.store
            .update_scan_status(scan_id, ScanStatus::Completed, None)
            .await?;

        // Alert evaluation never affects the scan's terminal status
        if let Err(e) = self.evaluator.evaluate(scan_id).await {
            tracing::error!(scan_id, error = %e, "Alert evaluation failed");
        }
        report(100);

        tracing::info!(
            scan_id,
            url = %url,
            performance = result.performance.score,
            accessibility = result.accessibility.score,
            seo = result.seo.score,
            best_practices = result.best_practices.score,
            security = result.security.score,
            "Scan completed"
        );
        Ok(result)
    }

    /// Generates AI fix recommendations for the scan's highest-severity
    /// issues, if the owner's plan includes them. Each recommendation is
    /// persisted as it is produced; per-issue generation failures skip
    /// that issue only. Returns the list sorted descending by score.
    async fn recommend(
        &self,
        scan_id: &str,
        url: &str,
        user_id: &str,
        issues: Vec<IssueRow>,
    ) -> Vec<sitescan_common::types::RankedRecommendation> {
        let Some(generator) = self.generator.as_ref() else {
            return Vec::new();
        };

        let entitled = match self.store.has_premium_access(user_id).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(scan_id, user_id, error = %e, "Entitlement lookup failed, skipping recommendations");
                false
            }
        };
        if !entitled {
            tracing::debug!(scan_id, user_id, "Owner plan does not include recommendations");
            return Vec::new();
        }

        let mut out = Vec::new();
        for issue in top_issues(issues, MAX_RECOMMENDED_ISSUES) {
            let input = RecommendationInput {
                url: url.to_string(),
                issue_title: issue.title.clone(),
                issue_description: issue.description.clone(),
                severity: issue.severity,
                category: issue.category,
            };
            let fix = match generator.generate(&input).await {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(
                        scan_id,
                        issue = %issue.title,
                        error = %e,
                        "Recommendation generation failed, skipping issue"
                    );
                    continue;
                }
            };

            let score = priority_score(fix.impact, fix.effort, fix.priority);
            let rec = NewRecommendation {
                issue_id: issue.id.clone(),
                description: fix.description.clone(),
                priority: fix.priority,
                implementation_details: fix.implementation_details.clone(),
                impact: fix.impact,
                effort: fix.effort,
                priority_score: score,
            };
            if let Err(e) = self.store.insert_recommendation(&rec).await {
                tracing::error!(scan_id, issue_id = %issue.id, error = %e, "Failed to persist recommendation");
            }

            out.push(sitescan_common::types::RankedRecommendation {
                issue_title: issue.title.clone(),
                description: fix.description,
                priority: fix.priority,
                implementation_details: fix.implementation_details,
                impact: fix.impact,
                effort: fix.effort,
                priority_score: score,
            });
        }
        out.sort_by(|a, b| {
            b.priority_score
                .partial_cmp(&a.priority_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}

fn flatten<T>(joined: Result<Result<T>, tokio::task::JoinError>) -> Result<T, String> {
    match joined {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("audit task panicked: {e}")),
    }
}
