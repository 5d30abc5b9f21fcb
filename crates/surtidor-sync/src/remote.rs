//! Remote directory source.
//!
//! The authority publishes two endpoints: a version query answering an ASCII
//! decimal and a snapshot fetch answering the full JSON user list. Both sit
//! behind redirecting front-ends, so only the final success response counts
//! as payload; intermediate redirect bodies are never written anywhere.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, redirect};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::SyncError;

/// Source of authoritative directory snapshots.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Query the current snapshot version on the authority.
    async fn fetch_version(&self) -> Result<u32, SyncError>;

    /// Stream the full snapshot into `dest`, replacing it. Returns the
    /// number of payload bytes written.
    async fn fetch_snapshot(&self, dest: &Path) -> Result<u64, SyncError>;
}

/// HTTP(S) remote directory source.
pub struct HttpRemote {
    client: Client,
    version_url: String,
    snapshot_url: String,
    version_timeout: Duration,
    snapshot_timeout: Duration,
}

impl HttpRemote {
    pub fn new(
        version_url: impl Into<String>,
        snapshot_url: impl Into<String>,
        version_timeout: Duration,
        snapshot_timeout: Duration,
    ) -> Result<Self, SyncError> {
        // Redirects are followed internally; the body handed back below is
        // always the final (non-redirect) response.
        let client = Client::builder()
            .redirect(redirect::Policy::limited(10))
            .build()
            .map_err(|e| SyncError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            version_url: version_url.into(),
            snapshot_url: snapshot_url.into(),
            version_timeout,
            snapshot_timeout,
        })
    }
}

#[async_trait]
impl RemoteDirectory for HttpRemote {
    async fn fetch_version(&self) -> Result<u32, SyncError> {
        debug!(url = %self.version_url, "querying remote directory version");
        let response = self
            .client
            .get(&self.version_url)
            .timeout(self.version_timeout)
            .send()
            .await
            .map_err(|e| {
                SyncError::Http(format!("version request failed for {}: {e}", self.version_url))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Http(format!(
                "HTTP {status} for {}",
                self.version_url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Http(format!("failed to read version body: {e}")))?;
        let trimmed = body.trim();
        trimmed
            .parse::<u32>()
            .map_err(|_| SyncError::InvalidVersion(trimmed.chars().take(32).collect()))
    }

    async fn fetch_snapshot(&self, dest: &Path) -> Result<u64, SyncError> {
        debug!(url = %self.snapshot_url, "fetching remote snapshot");
        let mut response = self
            .client
            .get(&self.snapshot_url)
            .timeout(self.snapshot_timeout)
            .send()
            .await
            .map_err(|e| {
                SyncError::Http(format!(
                    "snapshot request failed for {}: {e}",
                    self.snapshot_url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Http(format!(
                "HTTP {status} for {}",
                self.snapshot_url
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SyncError::Http(format!("snapshot body read failed: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url = %self.snapshot_url, bytes = written, "snapshot fetched");
        Ok(written)
    }
}
