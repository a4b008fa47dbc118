use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings of the report/ingestion server.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub api_keys: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .finish()
    }
}

/// Settings of the file-scanning ingestion client.
#[derive(Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub api_key: Option<String>,
    pub accounts_dir: PathBuf,
    pub clients_dir: PathBuf,
    pub dead_after_campaign_dir: PathBuf,
    pub dead_dir: PathBuf,
    pub roster_path: PathBuf,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("accounts_dir", &self.accounts_dir)
            .field("clients_dir", &self.clients_dir)
            .field("dead_after_campaign_dir", &self.dead_after_campaign_dir)
            .field("dead_dir", &self.dead_dir)
            .field("roster_path", &self.roster_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .finish()
    }
}
