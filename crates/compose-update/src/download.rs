//! HTTP fetching with timeouts, retry, cancellation and progress
//!
//! Metadata requests (release list, asset descriptions) use the short HTTP
//! timeout; binaries and checksum files use the download timeout. Bodies of
//! binaries are streamed chunk by chunk to disk.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use compose_core::retry::{ClosurePredicate, RetryExecutor, TracingObserver};
use compose_core::types::{RetryPolicy, RuntimeConfig};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, TransportError, UpdateError};

/// Retry policy key for metadata requests
const FEED_OPERATION: &str = "release-feed";

/// Retry policy key for downloads
const DOWNLOAD_OPERATION: &str = "download";

/// HTTP fetcher shared by every network stage
#[derive(Clone)]
pub struct Fetcher {
    /// HTTP client
    client: reqwest::Client,

    /// Accept header for API requests
    accept: String,

    /// Timeout for metadata requests
    metadata_timeout: Duration,

    /// Timeout for downloads
    download_timeout: Duration,

    /// Retry policy for metadata requests
    metadata_policy: RetryPolicy,

    /// Retry policy for downloads
    download_policy: RetryPolicy,

    /// Show a progress bar while downloading
    show_progress: bool,

    /// Aborts in-flight requests when cancelled
    cancel: CancellationToken,
}

impl Fetcher {
    /// Create a fetcher from runtime configuration
    pub fn new(config: &RuntimeConfig, cancel: CancellationToken) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .build()
            .map_err(UpdateError::Client)?;

        Ok(Self {
            client,
            accept: config.release_feed.accept.clone(),
            metadata_timeout: Duration::from_secs(config.network.http_timeout_secs),
            download_timeout: Duration::from_secs(config.network.download_timeout_secs),
            metadata_policy: config.retry_policies.for_operation(FEED_OPERATION),
            download_policy: config.retry_policies.for_operation(DOWNLOAD_OPERATION),
            show_progress: true,
            cancel,
        })
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// GET a JSON document and decode it
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, TransportError> {
        let body = self
            .with_retry(FEED_OPERATION, &self.metadata_policy, || self.get_body(url, true))
            .await?;

        serde_json::from_slice(&body).map_err(TransportError::Body)
    }

    /// GET a small body (such as a checksum file) into memory
    pub async fn download_bytes(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError> {
        debug!("Downloading {}", url);
        self.with_retry(DOWNLOAD_OPERATION, &self.download_policy, || self.get_body(url, false))
            .await
    }

    /// Stream a body into `dest`, returning the number of bytes written
    ///
    /// `dest` is truncated at the start of every attempt and removed when the
    /// download ultimately fails.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        label: &str,
    ) -> std::result::Result<u64, TransportError> {
        debug!("Downloading {} to {:?}", url, dest);

        let result = self
            .with_retry(DOWNLOAD_OPERATION, &self.download_policy, || {
                self.stream_to_file(url, dest, label)
            })
            .await;

        if result.is_err() {
            remove_partial(dest);
        }

        result
    }

    /// Run `op` under the retry policy, aborting when the token is cancelled
    async fn with_retry<F, Fut, T>(
        &self,
        operation: &str,
        policy: &RetryPolicy,
        op: F,
    ) -> std::result::Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let executor = RetryExecutor::new(policy.clone())
            .with_predicate(ClosurePredicate::new(TransportError::is_transient))
            .with_observer(TracingObserver::new(operation));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = executor.execute(op) => result.map_err(|e| e.into_source()),
        }
    }

    /// Single GET returning the whole body
    async fn get_body(
        &self,
        url: &str,
        metadata: bool,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let mut request = self.client.get(url);
        request = if metadata {
            request
                .header(ACCEPT, &self.accept)
                .timeout(self.metadata_timeout)
        } else {
            request.timeout(self.download_timeout)
        };

        let response = request.send().await.map_err(TransportError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status });
        }

        let body = response.bytes().await.map_err(TransportError::Request)?;
        Ok(body.to_vec())
    }

    /// Single streamed GET into a file
    async fn stream_to_file(
        &self,
        url: &str,
        dest: &Path,
        label: &str,
    ) -> std::result::Result<u64, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status });
        }

        let progress = self.progress_bar(response.content_length(), label);

        let mut file = tokio::fs::File::create(dest).await?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk: bytes::Bytes = chunk_result.map_err(TransportError::Request)?;
            file.write_all(&chunk).await?;

            downloaded += chunk.len() as u64;

            if let Some(pb) = &progress {
                pb.set_position(downloaded);
            }
        }

        file.flush().await?;
        file.sync_all().await?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        debug!("Downloaded {} bytes from {}", downloaded, url);
        Ok(downloaded)
    }

    fn progress_bar(&self, total: Option<u64>, label: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };

        let style = ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .map(|s| s.progress_chars("#>-"));

        match style {
            Ok(style) => pb.set_style(style),
            Err(e) => debug!("Falling back to default progress style: {}", e),
        }
        pb.set_message(format!("Downloading {}", label));
        Some(pb)
    }
}

/// Remove a partially written download
fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed partial download {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {:?}: {}", path, e),
    }
}

/// Convert bytes to human-readable size
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(0), "0.00 B");
        assert_eq!(human_readable_size(1023), "1023.00 B");
        assert_eq!(human_readable_size(1024), "1.00 KB");
        assert_eq!(human_readable_size(1024 * 1024), "1.00 MB");
        assert_eq!(human_readable_size(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_remove_partial_ignores_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("never-written");
        remove_partial(&path);
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_user_agent_is_a_configuration_error() {
        let mut config = RuntimeConfig::default();
        config.network.user_agent = "docker-compose\n2.3.0".to_string();

        let err = match Fetcher::new(&config, CancellationToken::new()) {
            Ok(_) => panic!("client should not build"),
            Err(e) => e,
        };
        assert!(matches!(err, UpdateError::Client(_)));
        assert_eq!(err.stage(), "configuration");
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let fetcher = Fetcher::new(&RuntimeConfig::default(), token)
            .unwrap()
            .with_progress(false);

        // Nothing listens on port 9; cancellation must win before any connect attempt
        let result = fetcher.download_bytes("http://127.0.0.1:9/checksum").await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }
}
