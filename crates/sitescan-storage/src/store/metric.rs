use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::metric::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::ScanStore;
use sitescan_common::types::IssueCategory;

/// Metric record (from the `metrics` table). Append-only per scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub id: String,
    pub scan_id: String,
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub category: IssueCategory,
    pub created_at: DateTime<Utc>,
}

/// Metric about to be written for a scan.
#[derive(Debug, Clone)]
pub struct NewMetric {
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub category: IssueCategory,
}

fn to_row(m: metric::Model) -> Result<MetricRow> {
    let category = m
        .category
        .parse::<IssueCategory>()
        .map_err(|e| StorageError::InvalidColumn {
            column: "category",
            message: e,
        })?;
    Ok(MetricRow {
        id: m.id,
        scan_id: m.scan_id,
        name: m.name,
        value: m.value,
        unit: m.unit,
        category,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

impl ScanStore {
    /// Writes a batch of metrics for one scan.
    pub async fn insert_metrics(&self, scan_id: &str, metrics: &[NewMetric]) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }
        let now = Utc::now().fixed_offset();
        let models: Vec<metric::ActiveModel> = metrics
            .iter()
            .map(|m| metric::ActiveModel {
                id: Set(sitescan_common::id::next_id()),
                scan_id: Set(scan_id.to_string()),
                name: Set(m.name.clone()),
                value: Set(m.value),
                unit: Set(m.unit.clone()),
                category: Set(m.category.to_string()),
                created_at: Set(now),
            })
            .collect();
        Entity::insert_many(models).exec(self.db()).await?;
        Ok(())
    }

    pub async fn list_metrics_for_scan(&self, scan_id: &str) -> Result<Vec<MetricRow>> {
        let models = Entity::find()
            .filter(Column::ScanId.eq(scan_id))
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    /// Removes all metrics a previous run wrote for this scan. Used to keep
    /// queue-level retries convergent.
    pub async fn delete_metrics_for_scan(&self, scan_id: &str) -> Result<u64> {
        let res = Entity::delete_many()
            .filter(Column::ScanId.eq(scan_id))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
