use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::entities::alert::{self, Column, Entity};
use crate::entities::alert_trigger::{self, Column as TriggerColumn, Entity as TriggerEntity};
use crate::error::StorageError;
use crate::store::ScanStore;
use sitescan_common::types::AlertCondition;

/// Alert definition (from the `alerts` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRow {
    pub id: String,
    pub user_id: String,
    pub website_id: String,
    pub metric_name: String,
    pub threshold: f64,
    pub condition: AlertCondition,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recorded threshold crossing (from the `alert_triggers` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertTriggerRow {
    pub id: String,
    pub alert_id: String,
    pub scan_id: String,
    pub metric_value: f64,
    pub triggered_at: DateTime<Utc>,
    pub notification_sent: bool,
}

fn to_row(m: alert::Model) -> Result<AlertRow> {
    let condition =
        m.condition
            .parse::<AlertCondition>()
            .map_err(|e| StorageError::InvalidColumn {
                column: "condition",
                message: e,
            })?;
    Ok(AlertRow {
        id: m.id,
        user_id: m.user_id,
        website_id: m.website_id,
        metric_name: m.metric_name,
        threshold: m.threshold,
        condition,
        is_active: m.is_active,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn to_trigger_row(m: alert_trigger::Model) -> AlertTriggerRow {
    AlertTriggerRow {
        id: m.id,
        alert_id: m.alert_id,
        scan_id: m.scan_id,
        metric_value: m.metric_value,
        triggered_at: m.triggered_at.with_timezone(&Utc),
        notification_sent: m.notification_sent,
    }
}

impl ScanStore {
    pub async fn create_alert(
        &self,
        user_id: &str,
        website_id: &str,
        metric_name: &str,
        threshold: f64,
        condition: AlertCondition,
    ) -> Result<AlertRow> {
        let now = Utc::now().fixed_offset();
        let am = alert::ActiveModel {
            id: Set(sitescan_common::id::next_id()),
            user_id: Set(user_id.to_string()),
            website_id: Set(website_id.to_string()),
            metric_name: Set(metric_name.to_string()),
            threshold: Set(threshold),
            condition: Set(condition.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        to_row(model)
    }

    /// Active alert definitions for one (owner, website) pair.
    pub async fn list_active_alerts(
        &self,
        user_id: &str,
        website_id: &str,
    ) -> Result<Vec<AlertRow>> {
        let models = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::WebsiteId.eq(website_id))
            .filter(Column::IsActive.eq(true))
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    pub async fn list_alerts_for_user(&self, user_id: &str) -> Result<Vec<AlertRow>> {
        let models = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by(Column::CreatedAt, Order::Desc)
            .all(self.db())
            .await?;
        models.into_iter().map(to_row).collect()
    }

    pub async fn insert_alert_trigger(
        &self,
        alert_id: &str,
        scan_id: &str,
        metric_value: f64,
    ) -> Result<AlertTriggerRow> {
        let now = Utc::now().fixed_offset();
        let am = alert_trigger::ActiveModel {
            id: Set(sitescan_common::id::next_id()),
            alert_id: Set(alert_id.to_string()),
            scan_id: Set(scan_id.to_string()),
            metric_value: Set(metric_value),
            triggered_at: Set(now),
            notification_sent: Set(false),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_trigger_row(model))
    }

    /// Existing trigger for an (alert, scan) pair, if evaluation already ran.
    pub async fn get_alert_trigger(
        &self,
        alert_id: &str,
        scan_id: &str,
    ) -> Result<Option<AlertTriggerRow>> {
        let model = TriggerEntity::find()
            .filter(TriggerColumn::AlertId.eq(alert_id))
            .filter(TriggerColumn::ScanId.eq(scan_id))
            .one(self.db())
            .await?;
        Ok(model.map(to_trigger_row))
    }

    pub async fn mark_trigger_notified(&self, trigger_id: &str) -> Result<()> {
        let model = TriggerEntity::find_by_id(trigger_id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "alert_trigger",
                id: trigger_id.to_string(),
            })?;
        let mut am: alert_trigger::ActiveModel = model.into();
        am.notification_sent = Set(true);
        am.update(self.db()).await?;
        Ok(())
    }

    pub async fn list_triggers_for_scan(&self, scan_id: &str) -> Result<Vec<AlertTriggerRow>> {
        let models = TriggerEntity::find()
            .filter(TriggerColumn::ScanId.eq(scan_id))
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_trigger_row).collect())
    }
}
