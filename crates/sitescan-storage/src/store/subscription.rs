use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::subscription::{self, Column, Entity};
use crate::store::ScanStore;

/// Plans whose owners receive AI fix recommendations.
const ENTITLED_PLANS: &[&str] = &["premium", "business"];

/// Subscription record (from the `subscriptions` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRow {
    pub id: String,
    pub user_id: String,
    pub plan: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: subscription::Model) -> SubscriptionRow {
    SubscriptionRow {
        id: m.id,
        user_id: m.user_id,
        plan: m.plan,
        status: m.status,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ScanStore {
    pub async fn create_subscription(
        &self,
        user_id: &str,
        plan: &str,
        status: &str,
    ) -> Result<SubscriptionRow> {
        let now = Utc::now().fixed_offset();
        let am = subscription::ActiveModel {
            id: Set(sitescan_common::id::next_id()),
            user_id: Set(user_id.to_string()),
            plan: Set(plan.to_string()),
            status: Set(status.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    /// True when the owner has an active premium or business subscription.
    pub async fn has_premium_access(&self, user_id: &str) -> Result<bool> {
        let model = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Status.eq("active"))
            .filter(Column::Plan.is_in(ENTITLED_PLANS.iter().copied()))
            .one(self.db())
            .await?;
        Ok(model.is_some())
    }
}
