//! HTTP clients for external audit collaborators.
//!
//! Each collaborator accepts `POST {endpoint}` with `{"url": "..."}` and
//! answers with the report JSON for its category. Scoring and tooling
//! live entirely on the collaborator side; these clients only carry the
//! protocol.

use crate::{AccessibilityAuditor, PageSpeedAuditor, SecurityAuditor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sitescan_common::types::{AccessibilityReport, PageSpeedReport, SecurityReport};
use std::time::Duration;

/// Shared transport for one collaborator endpoint.
pub struct RemoteCollaborator {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteCollaborator {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .with_context(|| format!("audit collaborator {} unreachable", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Audit collaborator returned an error response"
            );
            anyhow::bail!("audit collaborator returned HTTP {status}: {body}");
        }
        resp.json().await.map_err(|e| {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "Audit collaborator sent a malformed report");
            anyhow::Error::new(e)
                .context(format!("audit collaborator {} sent a malformed report", self.endpoint))
        })
    }
}

pub struct RemotePageSpeed(pub RemoteCollaborator);

#[async_trait]
impl PageSpeedAuditor for RemotePageSpeed {
    async fn audit(&self, url: &str) -> Result<PageSpeedReport> {
        self.0.fetch(url).await
    }
}

pub struct RemoteAccessibility(pub RemoteCollaborator);

#[async_trait]
impl AccessibilityAuditor for RemoteAccessibility {
    async fn audit(&self, url: &str) -> Result<AccessibilityReport> {
        self.0.fetch(url).await
    }
}

pub struct RemoteSecurity(pub RemoteCollaborator);

#[async_trait]
impl SecurityAuditor for RemoteSecurity {
    async fn audit(&self, url: &str) -> Result<SecurityReport> {
        self.0.fetch(url).await
    }
}
