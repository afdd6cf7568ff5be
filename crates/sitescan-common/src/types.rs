use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scan lifecycle status.
///
/// Transitions are monotonic: `pending -> in_progress -> {completed | failed}`.
/// The storage layer refuses to move a terminal scan back to a non-terminal
/// state.
///
/// # Examples
///
/// ```
/// use sitescan_common::types::ScanStatus;
///
/// let status: ScanStatus = "in_progress".parse().unwrap();
/// assert_eq!(status, ScanStatus::InProgress);
/// assert!(!status.is_terminal());
/// assert!(ScanStatus::Completed.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::InProgress => write!(f, "in_progress"),
            ScanStatus::Completed => write!(f, "completed"),
            ScanStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "in_progress" => Ok(ScanStatus::InProgress),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            _ => Err(format!("unknown scan status: {s}")),
        }
    }
}

/// Issue severity, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use sitescan_common::types::Severity;
///
/// let sev: Severity = "high".parse().unwrap();
/// assert_eq!(sev, Severity::High);
/// assert!(Severity::High > Severity::Low);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Recommendation priority tier assigned by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Weight applied when ranking recommendations.
    pub fn multiplier(&self) -> f64 {
        match self {
            Priority::Critical => 2.0,
            Priority::High => 1.5,
            Priority::Medium => 1.0,
            Priority::Low => 0.5,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// Quality dimension a metric or issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Performance,
    Accessibility,
    Seo,
    BestPractices,
    Security,
}

impl IssueCategory {
    /// Display label used for the per-category score metric row,
    /// e.g. `"Performance Score"`.
    pub fn score_metric_name(&self) -> &'static str {
        match self {
            IssueCategory::Performance => "Performance Score",
            IssueCategory::Accessibility => "Accessibility Score",
            IssueCategory::Seo => "SEO Score",
            IssueCategory::BestPractices => "Best Practices Score",
            IssueCategory::Security => "Security Score",
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::Performance => write!(f, "performance"),
            IssueCategory::Accessibility => write!(f, "accessibility"),
            IssueCategory::Seo => write!(f, "seo"),
            IssueCategory::BestPractices => write!(f, "best_practices"),
            IssueCategory::Security => write!(f, "security"),
        }
    }
}

impl std::str::FromStr for IssueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "performance" => Ok(IssueCategory::Performance),
            "accessibility" => Ok(IssueCategory::Accessibility),
            "seo" => Ok(IssueCategory::Seo),
            "best_practices" => Ok(IssueCategory::BestPractices),
            "security" => Ok(IssueCategory::Security),
            _ => Err(format!("unknown issue category: {s}")),
        }
    }
}

/// Threshold comparison direction for an alert definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            AlertCondition::Above => value > threshold,
            AlertCondition::Below => value < threshold,
        }
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertCondition::Above => write!(f, "above"),
            AlertCondition::Below => write!(f, "below"),
        }
    }
}

impl std::str::FromStr for AlertCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            _ => Err(format!("unknown alert condition: {s}")),
        }
    }
}

/// One problem detected by an audit collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuditIssue {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

/// A single named measurement produced by the page-speed auditor
/// (e.g. `"First Contentful Paint"` = 1.8 `"s"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedMetric {
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
}

/// Result of the combined performance / SEO / best-practices audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSpeedReport {
    pub performance_score: f64,
    pub seo_score: f64,
    pub best_practices_score: f64,
    pub metrics: Vec<NamedMetric>,
    pub performance_issues: Vec<AuditIssue>,
    pub seo_issues: Vec<AuditIssue>,
    pub best_practices_issues: Vec<AuditIssue>,
}

/// Result of the accessibility audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessibilityReport {
    pub score: f64,
    pub issues: Vec<AuditIssue>,
}

/// Result of the security-header audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    pub score: f64,
    pub grade: String,
    pub issues: Vec<AuditIssue>,
}

/// Maps a security score to its letter grade.
///
/// # Examples
///
/// ```
/// use sitescan_common::types::security_grade;
///
/// assert_eq!(security_grade(95.0), "A+");
/// assert_eq!(security_grade(75.0), "B");
/// assert_eq!(security_grade(50.0), "D");
/// assert_eq!(security_grade(10.0), "F");
/// ```
pub fn security_grade(score: f64) -> &'static str {
    if score >= 90.0 {
        "A+"
    } else if score >= 80.0 {
        "A"
    } else if score >= 70.0 {
        "B"
    } else if score >= 60.0 {
        "C"
    } else if score >= 50.0 {
        "D"
    } else {
        "F"
    }
}

/// Score plus issues for one quality dimension of an aggregated scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSection {
    pub score: f64,
    pub issues: Vec<AuditIssue>,
}

/// Security dimension additionally carries a letter grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySection {
    pub score: f64,
    pub grade: String,
    pub issues: Vec<AuditIssue>,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            score: 0.0,
            grade: "F".to_string(),
            issues: Vec::new(),
        }
    }
}

/// A prioritized fix attached to one issue of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRecommendation {
    pub issue_title: String,
    pub description: String,
    pub priority: Priority,
    pub implementation_details: String,
    pub impact: i32,
    pub effort: i32,
    pub priority_score: f64,
}

/// Aggregated outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: String,
    pub url: String,
    pub status: ScanStatus,
    pub error: Option<String>,
    pub performance: AuditSection,
    pub accessibility: AuditSection,
    pub seo: AuditSection,
    pub best_practices: AuditSection,
    pub security: SecuritySection,
    /// Sorted descending by `priority_score`. Empty when the owner is not
    /// entitled to AI recommendations.
    pub recommendations: Vec<RankedRecommendation>,
}

impl ScanResult {
    /// Failure-shaped result: empty sections, `status = failed`.
    pub fn failed(id: impl Into<String>, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            status: ScanStatus::Failed,
            error: Some(error.into()),
            performance: AuditSection::default(),
            accessibility: AuditSection::default(),
            seo: AuditSection::default(),
            best_practices: AuditSection::default(),
            security: SecuritySection::default(),
            recommendations: Vec::new(),
        }
    }
}

/// Merged persisted + live status returned to polling clients.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ScanStatusView {
    pub id: String,
    pub status: ScanStatus,
    /// Last reported progress, 0-100.
    pub progress: u8,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}
