//! Relational persistence layer for the scan platform.
//!
//! [`store::ScanStore`] wraps a SeaORM connection and exposes one access
//! module per concern (websites, scans, metrics, issues, recommendations,
//! alerts, subscriptions). Migrations run automatically on connect.

pub mod entities;
pub mod error;
pub mod store;


pub use store::ScanStore;
pub use store::{
    AlertRow, AlertTriggerRow, IssueRow, MetricRow, NewIssue, NewMetric, NewRecommendation,
    RecommendationRow, ScanRow, SubscriptionRow, WebsiteRow,
};
