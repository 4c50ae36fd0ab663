//! Default HTTP transport: streaming GET into a destination file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use updraft_core::{Fetcher, UpdateError, UpdateResult};

/// Default per-request timeout.
///
/// The engine core carries no timeout of its own; a stalled transfer is this
/// adapter's job to eventually fail.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// `reqwest`-backed implementation of the fetcher port.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> UpdateResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> UpdateResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpdateError::network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> UpdateResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpdateError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::network_with_status(
                format!("GET {url} failed"),
                status.as_u16(),
            ));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UpdateError::from_io_error(&e))?;
        }

        let mut file = fs::File::create(dest)
            .await
            .map_err(|e| UpdateError::from_io_error(&e))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdateError::network(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::from_io_error(&e))?;
        }

        file.flush()
            .await
            .map_err(|e| UpdateError::from_io_error(&e))?;
        Ok(())
    }
}
