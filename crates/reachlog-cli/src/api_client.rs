//! HTTP client for the reachlog server's ingestion endpoints.

use std::time::Duration;

use chrono::NaiveDate;
use reachlog_core::{ClientConfig, NewCampaign, SnapshotType};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::retry::retry_with_backoff;
use crate::scanner::ScannedAccount;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by server (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request rejected ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct SnapshotPayload<'a> {
    campaign_name: &'a str,
    snapshot_type: SnapshotType,
    accounts: &'a [ScannedAccount],
}

#[derive(Debug, Serialize)]
struct BulkPayload<'a> {
    accounts: &'a [ScannedAccount],
}

#[derive(Debug, Deserialize)]
struct IngestResult {
    accounts_processed: u64,
}

#[derive(Debug, Deserialize)]
struct BulkResult {
    accounts_written: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedCampaign {
    pub id: i64,
    pub name: String,
    pub campaign_date: NaiveDate,
}

/// Client for the protected `/api/v1` endpoints.
///
/// Transient failures (network, 429, 5xx) are retried with exponential
/// backoff up to `max_retries` additional attempts.
pub struct ReachlogClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ReachlogClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("reachlog-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries,
            backoff_base_ms,
        })
    }

    /// # Errors
    ///
    /// See [`ReachlogClient::new`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.server_url,
            config.api_key.clone(),
            config.request_timeout_secs,
            config.max_retries,
            config.retry_backoff_base_secs.saturating_mul(1_000),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    async fn post_once<B, T>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ClientError::RateLimited { retry_after_secs });
        }

        let text = response.text().await?;

        if status.is_server_error() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if !status.is_success() {
            let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => (envelope.error.code, envelope.error.message),
                Err(_) => ("unknown".to_string(), text),
            };
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        serde_json::from_str::<Envelope<T>>(&text)
            .map(|envelope| envelope.data)
            .map_err(|source| ClientError::Deserialize {
                context: url.to_string(),
                source,
            })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.post_once(&url, body)
        })
        .await
    }

    /// Submits one snapshot batch. Returns the number of accounts processed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] once retries are exhausted or on a non-retriable
    /// rejection (e.g. an unknown campaign).
    pub async fn submit_snapshot(
        &self,
        campaign_name: &str,
        snapshot_type: SnapshotType,
        accounts: &[ScannedAccount],
    ) -> Result<u64, ClientError> {
        let payload = SnapshotPayload {
            campaign_name,
            snapshot_type,
            accounts,
        };
        let result: IngestResult = self.post("/snapshots", &payload).await?;
        Ok(result.accounts_processed)
    }

    /// # Errors
    ///
    /// Returns [`ClientError`] once retries are exhausted.
    pub async fn refresh_accounts(&self, accounts: &[ScannedAccount]) -> Result<u64, ClientError> {
        let result: BulkResult = self.post("/accounts/bulk", &BulkPayload { accounts }).await?;
        Ok(result.accounts_written)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] for a duplicate name or invalid
    /// costs, or another [`ClientError`] once retries are exhausted.
    pub async fn create_campaign(
        &self,
        campaign: &NewCampaign,
    ) -> Result<CreatedCampaign, ClientError> {
        self.post("/campaigns", campaign).await
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| body.to_string(), |envelope| envelope.error.message)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
