use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// When set, unknown scan ids get a synthetic completed status from
    /// the reconciler instead of a 404. Never enable in production.
    #[serde(default)]
    pub test_mode: bool,

    /// CORS allowed origins; empty allows all origins (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub audits: AuditsConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

fn default_http_port() -> u16 {
    8080
}

/// Snowflake id generator coordinates; give every deployed instance a
/// distinct pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_id")]
    pub machine_id: i32,
    #[serde(default = "default_node_id")]
    pub node_id: i32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            machine_id: default_node_id(),
            node_id: default_node_id(),
        }
    }
}

fn default_node_id() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Full connection URL override; when unset a SQLite database inside
    /// `data_dir` is used.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            url: None,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}/sitescan.db?mode=rwc", self.data_dir),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff_secs(),
        }
    }
}

fn default_worker_count() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_secs() -> u64 {
    5
}

/// Endpoints of the external audit collaborator services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditsConfig {
    #[serde(default = "default_page_speed_url")]
    pub page_speed_url: String,
    #[serde(default = "default_accessibility_url")]
    pub accessibility_url: String,
    #[serde(default = "default_security_url")]
    pub security_url: String,
    #[serde(default = "default_audit_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AuditsConfig {
    fn default() -> Self {
        Self {
            page_speed_url: default_page_speed_url(),
            accessibility_url: default_accessibility_url(),
            security_url: default_security_url(),
            timeout_secs: default_audit_timeout_secs(),
        }
    }
}

fn default_page_speed_url() -> String {
    "http://127.0.0.1:7701/audit".to_string()
}

fn default_accessibility_url() -> String {
    "http://127.0.0.1:7702/audit".to_string()
}

fn default_security_url() -> String {
    "http://127.0.0.1:7703/audit".to_string()
}

fn default_audit_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL; provider default when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: None,
            model: None,
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

fn default_ai_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Webhook endpoints that receive fired alert notifications.
    #[serde(default)]
    pub webhook_endpoints: Vec<String>,
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert!(!config.test_mode);
        assert_eq!(config.queue.worker_count, 4);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.initial_backoff_secs, 5);
        assert_eq!(
            config.database.connection_url(),
            "sqlite://data/sitescan.db?mode=rwc"
        );
        assert!(!config.ai.enabled);
        assert!(config.alerts.webhook_endpoints.is_empty());
    }

    #[test]
    fn explicit_database_url_wins() {
        let config: ServerConfig = toml::from_str(
            r#"
            [database]
            data_dir = "/var/lib/sitescan"
            url = "sqlite:///tmp/override.db?mode=rwc"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database.connection_url(),
            "sqlite:///tmp/override.db?mode=rwc"
        );
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            http_port = 9000
            test_mode = true

            [queue]
            worker_count = 8

            [ai]
            enabled = true
            api_key = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert!(config.test_mode);
        assert_eq!(config.queue.worker_count, 8);
        assert_eq!(config.queue.max_attempts, 3);
        assert!(config.ai.enabled);
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.ai.timeout_secs, 60);
    }
}
