use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sitescan_common::types::AlertCondition;

/// Payload delivered when an alert fires for a scan.
#[derive(Debug, Clone)]
pub struct AlertNotification {
    pub alert_id: String,
    pub scan_id: String,
    pub website_url: String,
    pub metric_name: String,
    pub metric_value: f64,
    pub threshold: f64,
    pub condition: AlertCondition,
    pub triggered_at: DateTime<Utc>,
}

/// A notification delivery channel that sends fired alerts to an external
/// service.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the notification through this channel.
    async fn send(&self, notice: &AlertNotification) -> Result<()>;

    /// Returns the channel type name (e.g. `"webhook"`).
    fn channel_name(&self) -> &str;
}

/// POSTs the notification as JSON to a fixed endpoint.
pub struct WebhookChannel {
    endpoint: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn render_body(&self, notice: &AlertNotification) -> String {
        serde_json::json!({
            "alert_id": notice.alert_id,
            "scan_id": notice.scan_id,
            "website_url": notice.website_url,
            "metric": notice.metric_name,
            "value": notice.metric_value,
            "threshold": notice.threshold,
            "condition": notice.condition.to_string(),
            "triggered_at": notice.triggered_at.to_rfc3339(),
        })
        .to_string()
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, notice: &AlertNotification) -> Result<()> {
        let body = self.render_body(notice);
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {status}: {body}");
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
