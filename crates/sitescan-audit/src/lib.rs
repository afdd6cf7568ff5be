//! Audit collaborator boundary.
//!
//! The pipeline depends on three independent auditors through the traits
//! below; the actual tooling (a headless page-speed runner, an
//! accessibility checker, a header scanner) runs as external collaborator
//! services reached through the [`remote`] clients injected at startup.
//! [`fallback`] provides the fixed degraded
//! results substituted when a collaborator fails, so one audit's failure
//! never fails the whole scan.

pub mod fallback;
pub mod remote;


use anyhow::Result;
use async_trait::async_trait;
use sitescan_common::types::{AccessibilityReport, PageSpeedReport, SecurityReport};

/// Combined performance / SEO / best-practices auditor.
///
/// Timeouts are internal to the implementation; the pipeline only sees a
/// report or an error.
#[async_trait]
pub trait PageSpeedAuditor: Send + Sync {
    async fn audit(&self, url: &str) -> Result<PageSpeedReport>;
}

/// Accessibility auditor.
#[async_trait]
pub trait AccessibilityAuditor: Send + Sync {
    async fn audit(&self, url: &str) -> Result<AccessibilityReport>;
}

/// Security-header auditor.
#[async_trait]
pub trait SecurityAuditor: Send + Sync {
    async fn audit(&self, url: &str) -> Result<SecurityReport>;
}
