use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitescan_common::types::{IssueCategory, Priority, Severity};

/// Issue plus scan context handed to the generator.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationInput {
    pub url: String,
    pub issue_title: String,
    pub issue_description: String,
    pub severity: Severity,
    pub category: IssueCategory,
}

/// Prioritized fix produced by the generator.
#[derive(Debug, Clone, Deserialize)]
pub struct FixRecommendation {
    pub description: String,
    pub priority: Priority,
    pub implementation_details: String,
    /// Expected improvement, 1-10.
    pub impact: i32,
    /// Implementation cost, 1-10.
    pub effort: i32,
}

/// Recommendation generator trait (supports multiple model providers).
#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    /// Provider name (e.g. `"openai"`).
    fn provider(&self) -> &str;

    /// Model name (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Generates one fix recommendation for the given issue.
    async fn generate(&self, input: &RecommendationInput) -> Result<FixRecommendation>;
}
