use sitescan_common::types::Priority;
use sitescan_storage::IssueRow;

/// Computes the ranking score for a fix recommendation.
///
/// `impact` and `effort` are 1-10 estimates from the generator; effort is
/// clamped to at least 1 so a zero never divides. The result is rounded
/// to two decimal places.
///
/// # Examples
///
/// ```
/// use sitescan_common::types::Priority;
/// use sitescan_pipeline::priority::priority_score;
///
/// assert_eq!(priority_score(8, 3, Priority::Critical), 53.33);
/// assert_eq!(priority_score(5, 5, Priority::Medium), 10.0);
/// ```
pub fn priority_score(impact: i32, effort: i32, priority: Priority) -> f64 {
    let raw = (impact as f64 / effort.max(1) as f64) * 10.0 * priority.multiplier();
    (raw * 100.0).round() / 100.0
}

/// Selects the issues worth sending to the recommendation generator:
/// highest severity first, ties kept in insertion order, at most `limit`.
pub fn top_issues(mut issues: Vec<IssueRow>, limit: usize) -> Vec<IssueRow> {
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    issues.truncate(limit);
    issues
}
