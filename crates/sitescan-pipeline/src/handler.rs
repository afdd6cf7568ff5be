use crate::pipeline::ScanPipeline;
use anyhow::Result;
use async_trait::async_trait;
use sitescan_common::types::ScanStatus;
use sitescan_queue::{JobHandler, ProgressHandle};
use std::sync::Arc;

/// Bridges the job queue to the scan pipeline.
///
/// A failure-shaped pipeline result is surfaced as a handler error so the
/// queue's retry schedule applies; the pipeline is safe to re-invoke for
/// the same scan id because it clears prior artifacts before rewriting.
pub struct ScanJobHandler {
    pipeline: Arc<ScanPipeline>,
}

impl ScanJobHandler {
    pub fn new(pipeline: Arc<ScanPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl JobHandler for ScanJobHandler {
    async fn handle(&self, scan_id: &str, progress: ProgressHandle) -> Result<()> {
        let result = self
            .pipeline
            .run_with_progress(scan_id, move |pct| progress.report(pct))
            .await;
        match result.status {
            ScanStatus::Failed => Err(anyhow::anyhow!(
                result.error.unwrap_or_else(|| "scan failed".to_string())
            )),
            _ => Ok(()),
        }
    }
}
