use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod alert;
pub mod issue;
pub mod metric;
pub mod recommendation;
pub mod scan;
pub mod subscription;
pub mod website;

// ---- Public Row types (re-exported from the sub-modules) ----
pub use alert::{AlertRow, AlertTriggerRow};
pub use issue::{IssueRow, NewIssue};
pub use metric::{MetricRow, NewMetric};
pub use recommendation::{NewRecommendation, RecommendationRow};
pub use scan::ScanRow;
pub use subscription::SubscriptionRow;
pub use website::WebsiteRow;

/// Unified access layer over the platform database.
///
/// All methods are `async fn` on top of SeaORM. The connection URL is
/// provided by the caller (server config); SQLite example:
/// `sqlite:///data/sitescan.db?mode=rwc`.
pub struct ScanStore {
    pub(crate) db: DatabaseConnection,
}

impl ScanStore {
    /// Connects and initializes the database, running all pending
    /// `sea-orm-migration` migrations.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL mode only applies to SQLite
        if db_url.starts_with("sqlite://") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized scan store");

        Ok(Self { db })
    }

    /// Underlying connection reference, for the sub-modules.
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
