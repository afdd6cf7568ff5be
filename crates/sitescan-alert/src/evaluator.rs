use crate::notify::{AlertNotification, NotificationChannel};
use anyhow::Result;
use sitescan_storage::{AlertTriggerRow, ScanStore};
use std::sync::Arc;

/// Evaluates a scan's metrics against the owner's active alert
/// definitions.
pub struct AlertEvaluator {
    store: Arc<ScanStore>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl AlertEvaluator {
    pub fn new(store: Arc<ScanStore>, channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { store, channels }
    }

    /// Evaluates all active alerts for the scan's (owner, website) pair and
    /// returns the triggers recorded for this scan.
    ///
    /// An alert fires when its metric is present and the value crosses the
    /// threshold in the configured direction. Triggers are persisted with
    /// `notification_sent = false` first, then notifications are
    /// batch-dispatched and each successfully delivered trigger is marked
    /// sent. Per-trigger dispatch failures are logged and do not block the
    /// remaining triggers. Re-evaluating a scan reuses existing trigger
    /// rows instead of inserting duplicates.
    pub async fn evaluate(&self, scan_id: &str) -> Result<Vec<AlertTriggerRow>> {
        let (scan, website) = self
            .store
            .get_scan_with_website(scan_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("scan {scan_id} not found"))?;

        let alerts = self
            .store
            .list_active_alerts(&website.user_id, &website.id)
            .await?;
        if alerts.is_empty() {
            return Ok(Vec::new());
        }
        let metrics = self.store.list_metrics_for_scan(&scan.id).await?;

        let mut fired = Vec::new();
        for alert in &alerts {
            let Some(metric) = metrics.iter().find(|m| m.name == alert.metric_name) else {
                continue;
            };
            if !alert.condition.check(metric.value, alert.threshold) {
                continue;
            }

            let trigger = match self.store.get_alert_trigger(&alert.id, &scan.id).await? {
                Some(existing) => existing,
                None => {
                    self.store
                        .insert_alert_trigger(&alert.id, &scan.id, metric.value)
                        .await?
                }
            };
            tracing::info!(
                alert_id = %alert.id,
                scan_id = %scan.id,
                metric = %alert.metric_name,
                value = metric.value,
                threshold = alert.threshold,
                condition = %alert.condition,
                "Alert triggered"
            );
            fired.push((alert.clone(), trigger));
        }

        // Batch dispatch after all triggers are recorded
        let mut triggers = Vec::with_capacity(fired.len());
        for (alert, trigger) in fired {
            if trigger.notification_sent {
                triggers.push(trigger);
                continue;
            }

            let notice = AlertNotification {
                alert_id: alert.id.clone(),
                scan_id: scan.id.clone(),
                website_url: website.url.clone(),
                metric_name: alert.metric_name.clone(),
                metric_value: trigger.metric_value,
                threshold: alert.threshold,
                condition: alert.condition,
                triggered_at: trigger.triggered_at,
            };

            let mut delivered = !self.channels.is_empty();
            for channel in &self.channels {
                if let Err(e) = channel.send(&notice).await {
                    tracing::error!(
                        channel = channel.channel_name(),
                        alert_id = %alert.id,
                        error = %e,
                        "Failed to send alert notification"
                    );
                    delivered = false;
                }
            }

            if delivered {
                if let Err(e) = self.store.mark_trigger_notified(&trigger.id).await {
                    tracing::error!(
                        trigger_id = %trigger.id,
                        error = %e,
                        "Failed to mark trigger as notified"
                    );
                    triggers.push(trigger);
                    continue;
                }
                triggers.push(AlertTriggerRow {
                    notification_sent: true,
                    ..trigger
                });
            } else {
                triggers.push(trigger);
            }
        }

        Ok(triggers)
    }
}
