use crate::evaluator::AlertEvaluator;
use crate::notify::{AlertNotification, NotificationChannel};
use anyhow::Result;
use async_trait::async_trait;
use sitescan_common::types::{AlertCondition, IssueCategory};
use sitescan_storage::store::NewMetric;
use sitescan_storage::ScanStore;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct RecordingChannel {
    sent: Mutex<Vec<AlertNotification>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, notice: &AlertNotification) -> Result<()> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

struct FailingChannel;

#[async_trait]
impl NotificationChannel for FailingChannel {
    async fn send(&self, _notice: &AlertNotification) -> Result<()> {
        anyhow::bail!("gateway unreachable")
    }

    fn channel_name(&self) -> &str {
        "failing"
    }
}

async fn setup() -> (TempDir, Arc<ScanStore>) {
    sitescan_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("sitescan.db").display()
    );
    let store = Arc::new(ScanStore::new(&url).await.unwrap());
    (dir, store)
}

async fn seed_scan_with_metric(store: &ScanStore, value: f64) -> (String, String) {
    let site = store
        .get_or_create_website("user-1", "https://example.com", "example.com")
        .await
        .unwrap();
    let scan = store.create_scan(&site.id).await.unwrap();
    store
        .insert_metrics(
            &scan.id,
            &[NewMetric {
                name: "Performance Score".into(),
                value,
                unit: None,
                category: IssueCategory::Performance,
            }],
        )
        .await
        .unwrap();
    (site.id, scan.id)
}

#[tokio::test]
async fn below_condition_triggers_and_dispatches() {
    let (_dir, store) = setup().await;
    let (site_id, scan_id) = seed_scan_with_metric(&store, 45.0).await;
    store
        .create_alert(
            "user-1",
            &site_id,
            "Performance Score",
            50.0,
            AlertCondition::Below,
        )
        .await
        .unwrap();

    let channel = Arc::new(RecordingChannel {
        sent: Mutex::new(Vec::new()),
    });
    let evaluator = AlertEvaluator::new(
        store.clone(),
        vec![Box::new(ChannelRef(channel.clone()))],
    );

    let triggers = evaluator.evaluate(&scan_id).await.unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].metric_value, 45.0);
    assert!(triggers[0].notification_sent);

    let sent = channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].metric_name, "Performance Score");
}

#[tokio::test]
async fn above_condition_does_not_trigger_for_lower_value() {
    let (_dir, store) = setup().await;
    let (site_id, scan_id) = seed_scan_with_metric(&store, 45.0).await;
    store
        .create_alert(
            "user-1",
            &site_id,
            "Performance Score",
            50.0,
            AlertCondition::Above,
        )
        .await
        .unwrap();

    let evaluator = AlertEvaluator::new(store.clone(), Vec::new());
    let triggers = evaluator.evaluate(&scan_id).await.unwrap();
    assert!(triggers.is_empty());
    assert!(store
        .list_triggers_for_scan(&scan_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn dispatch_failure_leaves_trigger_unsent_but_evaluation_succeeds() {
    let (_dir, store) = setup().await;
    let (site_id, scan_id) = seed_scan_with_metric(&store, 45.0).await;
    store
        .create_alert(
            "user-1",
            &site_id,
            "Performance Score",
            50.0,
            AlertCondition::Below,
        )
        .await
        .unwrap();

    let evaluator = AlertEvaluator::new(store.clone(), vec![Box::new(FailingChannel)]);
    let triggers = evaluator.evaluate(&scan_id).await.unwrap();
    assert_eq!(triggers.len(), 1);
    assert!(!triggers[0].notification_sent);
}

#[tokio::test]
async fn reevaluation_does_not_duplicate_triggers() {
    let (_dir, store) = setup().await;
    let (site_id, scan_id) = seed_scan_with_metric(&store, 45.0).await;
    store
        .create_alert(
            "user-1",
            &site_id,
            "Performance Score",
            50.0,
            AlertCondition::Below,
        )
        .await
        .unwrap();

    let evaluator = AlertEvaluator::new(store.clone(), Vec::new());
    evaluator.evaluate(&scan_id).await.unwrap();
    evaluator.evaluate(&scan_id).await.unwrap();

    let stored = store.list_triggers_for_scan(&scan_id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn alerts_without_matching_metric_are_skipped() {
    let (_dir, store) = setup().await;
    let (site_id, scan_id) = seed_scan_with_metric(&store, 45.0).await;
    store
        .create_alert(
            "user-1",
            &site_id,
            "Accessibility Score",
            80.0,
            AlertCondition::Below,
        )
        .await
        .unwrap();

    let evaluator = AlertEvaluator::new(store.clone(), Vec::new());
    let triggers = evaluator.evaluate(&scan_id).await.unwrap();
    assert!(triggers.is_empty());
}

/// Adapter so a shared `Arc<RecordingChannel>` can be handed to the
/// evaluator, which owns its channels.
struct ChannelRef(Arc<RecordingChannel>);

#[async_trait]
impl NotificationChannel for ChannelRef {
    async fn send(&self, notice: &AlertNotification) -> Result<()> {
        self.0.send(notice).await
    }

    fn channel_name(&self) -> &str {
        self.0.channel_name()
    }
}
