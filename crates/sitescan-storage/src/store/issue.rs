use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::issue::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::ScanStore;
use sitescan_common::types::{IssueCategory, Severity};

/// Issue record (from the `issues` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRow {
    pub id: String,
    pub scan_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub created_at: DateTime<Utc>,
}

/// Issue about to be written for a scan.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: IssueCategory,
}

fn to_row(m: issue::Model) -> Result<IssueRow> {
    let severity = m
        .severity
        .parse::<Severity>()
        .map_err(|e| StorageError::InvalidColumn {
            column: "severity",
            message: e,
        })?;
    let category = m
        .category
        .parse::<IssueCategory>()
        .map_err(|e| StorageError::InvalidColumn {
            column: "category",
            message: e,
        })?;
    Ok(IssueRow {
        id: m.id,
        scan_id: m.scan_id,
        title: m.title,
        description: m.description,
        severity,
        category,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

impl ScanStore {
    /// Writes the detected issues for one scan and returns the stored rows
    /// (with their generated ids) in insertion order.
    pub async fn insert_issues(&self, scan_id: &str, issues: &[NewIssue]) -> Result<Vec<IssueRow>> {
        let now = Utc::now().fixed_offset();
        let mut rows = Vec::with_capacity(issues.len());
        for i in issues {
            let am = issue::ActiveModel {
                id: Set(sitescan_common::id::next_id()),
                scan_id: Set(scan_id.to_string()),
                title: Set(i.title.clone()),
                description: Set(i.description.clone()),
                severity: Set(i.severity.to_string()),
                category: Set(i.category.to_string()),
                created_at: Set(now),
            };
            let model = am.insert(self.db()).await?;
            rows.push(to_row(model)?);
        }
        Ok(rows)
    }

    pub async fn list_issues_for_scan(&self, scan_id: &str) -> Result<Vec<IssueRow>> {
        let models = Entity::find()
            .filter(Column::ScanId.eq(scan_id))
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    /// Removes all issues (and their recommendations) a previous run wrote
    /// for this scan. Used to keep queue-level retries convergent.
    pub async fn delete_issues_for_scan(&self, scan_id: &str) -> Result<u64> {
        let issue_ids: Vec<String> = Entity::find()
            .filter(Column::ScanId.eq(scan_id))
            .all(self.db())
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        if !issue_ids.is_empty() {
            self.delete_recommendations_for_issues(&issue_ids).await?;
        }
        let res = Entity::delete_many()
            .filter(Column::ScanId.eq(scan_id))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
