//! GitHub API interaction module
//!
//! Fetches release metadata and opens asset downloads for the manager's
//! release feed.

use crate::download::ArchiveStream;
use crate::error::{BootstrapError, TransportError};
use crate::types::ReleaseMetadata;
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::io;
use tokio_util::io::StreamReader;

const USER_AGENT: &str = concat!("toolstrap/", env!("CARGO_PKG_VERSION"));

/// HTTP side of the install branch.
#[async_trait]
pub trait ReleaseClient: Send + Sync {
    async fn latest_release(&self, url: &str) -> Result<ReleaseMetadata, BootstrapError>;

    async fn open_download(&self, url: &str) -> Result<ArchiveStream, BootstrapError>;
}

/// Build GitHub API URL for the latest release of `repo` ("owner/repo").
pub fn build_latest_release_url(repo: &str) -> String {
    format!("https://api.github.com/repos/{}/releases/latest", repo)
}

pub struct GitHubReleaseClient {
    client: Client,
    token: Option<String>,
    show_progress: bool,
}

impl GitHubReleaseClient {
    pub fn new(show_progress: bool) -> Result<Self, BootstrapError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BootstrapError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Self {
            client,
            token,
            show_progress,
        })
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            tracing::debug!("Using GitHub token");
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        request
    }

    fn progress_bar(&self, total: Option<u64>, url: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let filename = url.rsplit('/').next().unwrap_or(url).to_string();
        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                ) {
                    pb.set_style(style.progress_chars("#>-"));
                }
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(format!("Downloading {}", filename));
        pb.with_finish(ProgressFinish::WithMessage("Download complete".into()))
    }
}

fn status_detail(status: StatusCode) -> String {
    format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

#[async_trait]
impl ReleaseClient for GitHubReleaseClient {
    async fn latest_release(&self, url: &str) -> Result<ReleaseMetadata, BootstrapError> {
        tracing::debug!("Fetching GitHub release info from: {}", url);

        let fetch_failed = |status: Option<u16>, detail: String| BootstrapError::ReleaseFetchFailed {
            url: url.to_string(),
            status,
            detail,
        };

        let response = self
            .request(url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| fetch_failed(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut detail = status_detail(status);
            if !body.trim().is_empty() {
                detail = format!("{} - {}", detail, body.trim());
            }
            return Err(fetch_failed(Some(status.as_u16()), detail));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_failed(Some(status.as_u16()), e.to_string()))?;
        if body.trim().is_empty() {
            return Err(fetch_failed(
                Some(status.as_u16()),
                "empty response body".to_string(),
            ));
        }

        let release: ReleaseMetadata = serde_json::from_str(&body).map_err(|e| {
            fetch_failed(
                Some(status.as_u16()),
                format!("could not parse release JSON: {}", e),
            )
        })?;

        tracing::debug!(
            "Release {} lists {} asset(s)",
            release.display_name(),
            release.assets.len()
        );
        Ok(release)
    }

    async fn open_download(&self, url: &str) -> Result<ArchiveStream, BootstrapError> {
        let download_failed = |status: Option<u16>, detail: String| {
            BootstrapError::AssetDownloadFailed {
                url: url.to_string(),
                status,
                detail,
            }
        };

        let response = self
            .request(url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| download_failed(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_failed(Some(status.as_u16()), status_detail(status)));
        }

        let pb = self.progress_bar(response.content_length(), url);
        let stream = response
            .bytes_stream()
            .inspect_ok(move |chunk| pb.inc(chunk.len() as u64))
            .map(|chunk| chunk.map_err(|e| TransportError(e.to_string()).into_io()));

        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }
}
