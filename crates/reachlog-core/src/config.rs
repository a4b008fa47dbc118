use std::env::VarError;
use std::path::PathBuf;

use crate::app_config::{AppConfig, ClientConfig, Environment};
use crate::ConfigError;

/// Load server configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load server configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load ingestion client configuration, reading `.env` first.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_client_config() -> Result<ClientConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_client_config(|key| std::env::var(key))
}

/// Typed accessors over an env-var lookup function.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    fn require(&self, var: &str) -> Result<String, ConfigError> {
        (self.lookup)(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    }

    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var).ok().filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, var: &str, default: &str) -> String {
        (self.lookup)(var).unwrap_or_else(|_| default.to_string())
    }

    fn parse<T>(&self, var: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(var, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Build server configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let vars = Vars { lookup };

    let database_url = vars.require("DATABASE_URL")?;
    let env = parse_environment(&vars.or_default("REACHLOG_ENV", "development"));
    let bind_addr = vars.parse("REACHLOG_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = vars.or_default("REACHLOG_LOG_LEVEL", "info");

    let db_max_connections = vars.parse("REACHLOG_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = vars.parse("REACHLOG_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = vars.parse("REACHLOG_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let rate_limit_per_minute = vars.parse("REACHLOG_RATE_LIMIT_PER_MINUTE", "120")?;

    let api_keys: Vec<String> = vars
        .optional("REACHLOG_API_KEYS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();
    if api_keys.is_empty() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("REACHLOG_API_KEYS".to_string()));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        rate_limit_per_minute,
        api_keys,
    })
}

fn build_client_config<F>(lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let vars = Vars { lookup };

    let server_url = vars
        .require("REACHLOG_SERVER_URL")?
        .trim_end_matches('/')
        .to_string();
    let api_key = vars.optional("REACHLOG_API_KEY");

    let accounts_dir = PathBuf::from(vars.or_default("REACHLOG_ACCOUNTS_DIR", "./accounts"));
    let clients_dir = PathBuf::from(vars.or_default("REACHLOG_CLIENTS_DIR", "./clients"));
    let dead_after_campaign_dir = vars
        .optional("REACHLOG_DEAD_AFTER_CAMPAIGN_DIR")
        .map_or_else(|| accounts_dir.join("dead-after-campaign"), PathBuf::from);
    let dead_dir = vars
        .optional("REACHLOG_DEAD_DIR")
        .map_or_else(|| accounts_dir.join("dead"), PathBuf::from);
    let roster_path =
        PathBuf::from(vars.or_default("REACHLOG_ROSTER_PATH", "./reachlog-roster.json"));

    let request_timeout_secs = vars.parse("REACHLOG_REQUEST_TIMEOUT_SECS", "30")?;
    let max_retries = vars.parse("REACHLOG_MAX_RETRIES", "3")?;
    let retry_backoff_base_secs = vars.parse("REACHLOG_RETRY_BACKOFF_BASE_SECS", "2")?;

    Ok(ClientConfig {
        server_url,
        api_key,
        accounts_dir,
        clients_dir,
        dead_after_campaign_dir,
        dead_dir,
        roster_path,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_secs,
    })
}

/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
