use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::entities::scan::{self, Entity};
use crate::error::StorageError;
use crate::store::website::{self as website_store, WebsiteRow};
use crate::store::ScanStore;
use sitescan_common::types::ScanStatus;

/// Scan record (from the `scans` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRow {
    pub id: String,
    pub website_id: String,
    pub status: ScanStatus,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: scan::Model) -> Result<ScanRow> {
    let status = m
        .status
        .parse::<ScanStatus>()
        .map_err(|e| StorageError::InvalidColumn {
            column: "status",
            message: e,
        })?;
    Ok(ScanRow {
        id: m.id,
        website_id: m.website_id,
        status,
        error: m.error,
        completed_at: m.completed_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

impl ScanStore {
    /// Creates a new scan in `pending` state.
    pub async fn create_scan(&self, website_id: &str) -> Result<ScanRow> {
        let now = Utc::now().fixed_offset();
        let am = scan::ActiveModel {
            id: Set(sitescan_common::id::next_id()),
            website_id: Set(website_id.to_string()),
            status: Set(ScanStatus::Pending.to_string()),
            error: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        to_row(model)
    }

    pub async fn get_scan_by_id(&self, id: &str) -> Result<Option<ScanRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_row).transpose()
    }

    /// Loads a scan together with its parent website.
    pub async fn get_scan_with_website(&self, id: &str) -> Result<Option<(ScanRow, WebsiteRow)>> {
        let Some(scan_model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let scan = to_row(scan_model)?;
        let website = crate::entities::website::Entity::find_by_id(&scan.website_id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "website",
                id: scan.website_id.clone(),
            })?;
        Ok(Some((scan, website_store::to_row(website))))
    }

    /// Updates a scan's status.
    ///
    /// Transitions are monotonic: moving a terminal scan back to a
    /// non-terminal state is rejected with
    /// [`StorageError::TerminalTransition`]. Re-asserting the current
    /// terminal state is a no-op. `completed_at` is stamped when the scan
    /// first reaches a terminal state.
    pub async fn update_scan_status(
        &self,
        id: &str,
        status: ScanStatus,
        error: Option<&str>,
    ) -> Result<ScanRow> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "scan",
                id: id.to_string(),
            })?;
        let current = to_row(model.clone())?;

        if current.status.is_terminal() {
            if current.status == status {
                return Ok(current);
            }
            return Err(StorageError::TerminalTransition {
                scan_id: id.to_string(),
                from: current.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }

        let now = Utc::now().fixed_offset();
        let mut am: scan::ActiveModel = model.into();
        am.status = Set(status.to_string());
        am.error = Set(error.map(String::from));
        am.updated_at = Set(now);
        if status.is_terminal() {
            am.completed_at = Set(Some(now));
        }
        let updated = am.update(self.db()).await?;
        to_row(updated)
    }
}
