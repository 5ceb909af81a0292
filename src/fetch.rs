//! Fetcher stage - downloads the remote source file into the work dir.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{InstallError, Result};

/// A source file written to disk by [`Fetcher::fetch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedSource {
    pub path: PathBuf,
    pub bytes: u64,
    /// Hex SHA-256 of the body, informational only
    pub sha256: String,
}

/// Downloads a single resource over HTTP(S)
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a fetcher, `timeout_ms == 0` disables the request timeout
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| InstallError::Fetch(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Download `url` and write it verbatim to `dest`, replacing any existing file
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedSource> {
        info!("Fetching {} -> {}", url, dest.display());

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InstallError::Fetch(format!("Error fetching {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::Fetch(format!("{} returned HTTP {}", url, status)));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut hasher = Sha256::new();
        let mut bytes: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| InstallError::Fetch(format!("Error reading body of {}: {}", url, e)))?;
            hasher.update(&chunk);
            bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        if bytes == 0 {
            tokio::fs::remove_file(dest).await?;
            return Err(InstallError::Fetch(format!("{} returned an empty body", url)));
        }

        let sha256 = hex::encode(hasher.finalize());
        debug!("Fetched {} bytes, sha256 {}", bytes, sha256);

        Ok(FetchedSource {
            path: dest.to_path_buf(),
            bytes,
            sha256,
        })
    }
}
