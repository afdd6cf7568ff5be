use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::entities::website::{self, Column, Entity};
use crate::store::ScanStore;

/// Website record (from the `websites` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteRow {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn to_row(m: website::Model) -> WebsiteRow {
    WebsiteRow {
        id: m.id,
        user_id: m.user_id,
        url: m.url,
        name: m.name,
        is_active: m.is_active,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl ScanStore {
    /// Returns the website for `(user_id, url)`, creating it on first use.
    pub async fn get_or_create_website(
        &self,
        user_id: &str,
        url: &str,
        name: &str,
    ) -> Result<WebsiteRow> {
        let existing = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Url.eq(url))
            .one(self.db())
            .await?;
        if let Some(m) = existing {
            return Ok(to_row(m));
        }

        let now = Utc::now().fixed_offset();
        let am = website::ActiveModel {
            id: Set(sitescan_common::id::next_id()),
            user_id: Set(user_id.to_string()),
            url: Set(url.to_string()),
            name: Set(name.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn get_website_by_id(&self, id: &str) -> Result<Option<WebsiteRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }
}
