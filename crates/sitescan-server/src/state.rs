use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use sitescan_pipeline::StatusReconciler;
use sitescan_queue::JobQueue;
use sitescan_storage::ScanStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ScanStore>,
    pub queue: Arc<JobQueue>,
    pub reconciler: Arc<StatusReconciler>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}
