//! Fixed degraded results substituted when an audit collaborator fails.

use sitescan_common::types::{
    security_grade, AccessibilityReport, AuditIssue, PageSpeedReport, SecurityReport, Severity,
};

/// Score assigned to every category of a failed audit.
pub const FALLBACK_SCORE: f64 = 50.0;

fn failure_issue(audit_name: &str, reason: &str) -> AuditIssue {
    AuditIssue {
        title: format!("{audit_name} audit could not be completed"),
        description: format!("The {audit_name} audit failed and a degraded result was substituted: {reason}"),
        severity: Severity::Medium,
    }
}

/// Degraded page-speed result: all three scores fixed at 50, no metrics,
/// one synthetic issue describing the failure.
pub fn page_speed(reason: &str) -> PageSpeedReport {
    PageSpeedReport {
        performance_score: FALLBACK_SCORE,
        seo_score: FALLBACK_SCORE,
        best_practices_score: FALLBACK_SCORE,
        metrics: Vec::new(),
        performance_issues: vec![failure_issue("page speed", reason)],
        seo_issues: Vec::new(),
        best_practices_issues: Vec::new(),
    }
}

/// Degraded accessibility result.
pub fn accessibility(reason: &str) -> AccessibilityReport {
    AccessibilityReport {
        score: FALLBACK_SCORE,
        issues: vec![failure_issue("accessibility", reason)],
    }
}

/// Degraded security result. A score of 50 maps to grade D.
pub fn security(reason: &str) -> SecurityReport {
    SecurityReport {
        score: FALLBACK_SCORE,
        grade: security_grade(FALLBACK_SCORE).to_string(),
        issues: vec![failure_issue("security header", reason)],
    }
}
