use async_trait::async_trait;
use cardsync::{Collection, RemoteCollectionService, Result, SyncError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::RemoteConfig;
use super::types::BackupResponse;

/// HTTP client for the collection server.
pub struct HttpCollectionService {
    config: RemoteConfig,
    http_client: reqwest::Client,
    last_success: Arc<AtomicU64>, // Unix timestamp in seconds
}

impl HttpCollectionService {
    pub fn new(config: RemoteConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
            last_success: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn last_success_timestamp(&self) -> u64 {
        self.last_success.load(Ordering::Relaxed)
    }

    fn mark_success(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_success.store(now, Ordering::Relaxed);
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Status {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl RemoteCollectionService for HttpCollectionService {
    async fn fetch(&self) -> Result<Collection> {
        let url = self.config.load_url();

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("Failed to fetch {}: {}", url, e)))?;
        let response = Self::check_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Transport(format!("Failed to read body from {}: {}", url, e)))?;
        let collection = Collection::from_json(&body)?;

        self.mark_success();
        Ok(collection)
    }

    async fn push(&self, collection: &Collection) -> Result<()> {
        let url = self.config.save_url();

        let response = self
            .http_client
            .post(&url)
            .json(collection)
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("Failed to send to {}: {}", url, e)))?;
        let response = Self::check_status(response).await?;

        let resp: BackupResponse = response.json().await.map_err(|e| {
            SyncError::MalformedPayload(format!("Failed to parse response from {}: {}", url, e))
        })?;

        if !resp.success {
            return Err(SyncError::Rejected(
                resp.error
                    .unwrap_or_else(|| "server answered success: false".to_string()),
            ));
        }

        self.mark_success();
        tracing::debug!("[REMOTE] saved {} records to {}", collection.len(), url);
        Ok(())
    }

    fn describe(&self) -> String {
        self.config.base_url.clone()
    }
}
