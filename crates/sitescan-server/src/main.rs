use anyhow::Result;
use chrono::Utc;
use sitescan_ai::{OpenAiProvider, RecommendationGenerator};
use sitescan_alert::{AlertEvaluator, NotificationChannel, WebhookChannel};
use sitescan_audit::remote::{
    RemoteAccessibility, RemoteCollaborator, RemotePageSpeed, RemoteSecurity,
};
use sitescan_pipeline::{ScanJobHandler, ScanPipeline, StatusReconciler};
use sitescan_queue::{JobQueue, RetryPolicy};
use sitescan_storage::ScanStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use sitescan_server::app;
use sitescan_server::config::ServerConfig;
use sitescan_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  sitescan-server [config.toml]    Start the server");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sitescan=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        path => run_server(path.unwrap_or("config/server.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    sitescan_common::id::init(config.node.machine_id, config.node.node_id);

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        workers = config.queue.worker_count,
        test_mode = config.test_mode,
        "sitescan-server starting"
    );

    std::fs::create_dir_all(&config.database.data_dir)?;
    let store = Arc::new(ScanStore::new(&config.database.connection_url()).await?);

    // Audit collaborators
    let audit_timeout = Duration::from_secs(config.audits.timeout_secs);
    let page_speed = Arc::new(RemotePageSpeed(RemoteCollaborator::new(
        &config.audits.page_speed_url,
        audit_timeout,
    )?));
    let accessibility = Arc::new(RemoteAccessibility(RemoteCollaborator::new(
        &config.audits.accessibility_url,
        audit_timeout,
    )?));
    let security = Arc::new(RemoteSecurity(RemoteCollaborator::new(
        &config.audits.security_url,
        audit_timeout,
    )?));

    // AI recommendations are optional; without a key the pipeline skips them
    let generator: Option<Arc<dyn RecommendationGenerator>> = match (
        config.ai.enabled,
        config.ai.api_key.clone(),
    ) {
        (true, Some(api_key)) => {
            let provider = OpenAiProvider::new(
                api_key,
                config.ai.model.clone(),
                config.ai.base_url.clone(),
                Some(config.ai.timeout_secs),
                None,
                None,
            )?;
            tracing::info!(model = provider.model_name(), "AI recommendations enabled");
            Some(Arc::new(provider))
        }
        (true, None) => {
            tracing::warn!("[ai] enabled but no api_key configured, recommendations disabled");
            None
        }
        _ => {
            tracing::info!("AI recommendations disabled");
            None
        }
    };

    let channels: Vec<Box<dyn NotificationChannel>> = config
        .alerts
        .webhook_endpoints
        .iter()
        .map(|endpoint| Box::new(WebhookChannel::new(endpoint)) as Box<dyn NotificationChannel>)
        .collect();
    if channels.is_empty() {
        tracing::info!("No notification channels configured, alert triggers will not be delivered");
    }
    let evaluator = Arc::new(AlertEvaluator::new(store.clone(), channels));

    let pipeline = Arc::new(ScanPipeline::new(
        store.clone(),
        page_speed,
        accessibility,
        security,
        generator,
        evaluator,
    ));

    let queue = Arc::new(JobQueue::new(RetryPolicy::new(
        config.queue.max_attempts,
        Duration::from_secs(config.queue.initial_backoff_secs),
    )));
    queue.start(
        Arc::new(ScanJobHandler::new(pipeline)),
        config.queue.worker_count,
    );

    let reconciler = Arc::new(StatusReconciler::new(
        store.clone(),
        queue.clone(),
        config.test_mode,
    ));

    let state = AppState {
        store,
        queue: queue.clone(),
        reconciler,
        start_time: Utc::now(),
        config: Arc::new(config),
    };

    let addr: SocketAddr = format!("0.0.0.0:{}", state.config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = app::build_http_app(state);
    tracing::info!(http = %addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gracefully");
        })
        .await?;

    queue.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}
