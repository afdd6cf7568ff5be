use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::recommendation::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::ScanStore;
use sitescan_common::types::Priority;

/// Recommendation record (from the `recommendations` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub id: String,
    pub issue_id: String,
    pub description: String,
    pub priority: Priority,
    pub implementation_details: String,
    pub impact: i32,
    pub effort: i32,
    pub priority_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Recommendation about to be written for an issue.
#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub issue_id: String,
    pub description: String,
    pub priority: Priority,
    pub implementation_details: String,
    pub impact: i32,
    pub effort: i32,
    pub priority_score: f64,
}

fn to_row(m: recommendation::Model) -> Result<RecommendationRow> {
    let priority = m
        .priority
        .parse::<Priority>()
        .map_err(|e| StorageError::InvalidColumn {
            column: "priority",
            message: e,
        })?;
    Ok(RecommendationRow {
        id: m.id,
        issue_id: m.issue_id,
        description: m.description,
        priority,
        implementation_details: m.implementation_details,
        impact: m.impact,
        effort: m.effort,
        priority_score: m.priority_score,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

impl ScanStore {
    pub async fn insert_recommendation(
        &self,
        rec: &NewRecommendation,
    ) -> Result<RecommendationRow> {
        let now = Utc::now().fixed_offset();
        let am = recommendation::ActiveModel {
            id: Set(sitescan_common::id::next_id()),
            issue_id: Set(rec.issue_id.clone()),
            description: Set(rec.description.clone()),
            priority: Set(rec.priority.to_string()),
            implementation_details: Set(rec.implementation_details.clone()),
            impact: Set(rec.impact),
            effort: Set(rec.effort),
            priority_score: Set(rec.priority_score),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        to_row(model)
    }

    pub async fn list_recommendations_for_issues(
        &self,
        issue_ids: &[String],
    ) -> Result<Vec<RecommendationRow>> {
        if issue_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = Entity::find()
            .filter(Column::IssueId.is_in(issue_ids.iter().cloned()))
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    pub(crate) async fn delete_recommendations_for_issues(
        &self,
        issue_ids: &[String],
    ) -> Result<u64> {
        let res = Entity::delete_many()
            .filter(Column::IssueId.is_in(issue_ids.iter().cloned()))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
