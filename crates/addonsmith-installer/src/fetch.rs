//! Remote probe and download
//!
//! Two round trips per remote install: a HEAD probe that decides the
//! remote filename (and rejects unsupported content before the body is
//! pulled), then the actual GET. No retries; any transport failure
//! surfaces to the caller as-is.

use addonsmith_core::{Error, FetchResult, Result};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use tracing::debug;

use crate::classify;

/// Some hosts reject requests carrying a default client user agent,
/// so we present a browser-like one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/111.0.0.0 Safari/537.36";

const TEXT_CONTENT_TYPE: &str = "text/plain";
const ZIP_CONTENT_TYPE: &str = "application/zip";

/// HTTP fetcher for remote addon packages
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a new fetcher
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::transport)?;
        Ok(Self { client })
    }

    /// Probe a URL with a header-only request
    ///
    /// Returns the remote filename when the resource looks like an
    /// installable package, `None` otherwise.
    pub async fn probe(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(Error::transport)?;

        let headers = response.headers();
        let disposition = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok());
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

        let filename = filename_from_headers(url, disposition, content_type);
        debug!("Probed '{}': filename {:?}", url, filename);
        Ok(filename)
    }

    /// Download the full payload
    ///
    /// `filename` is the name decided by a prior successful [`probe`].
    ///
    /// [`probe`]: Fetcher::probe
    pub async fn fetch(&self, url: &str, filename: String) -> Result<FetchResult> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(Error::transport)?;

        let content = response.bytes().await.map_err(Error::transport)?.to_vec();
        debug!("Fetched '{}' ({} bytes)", filename, content.len());

        Ok(FetchResult { filename, content })
    }
}

/// Decide the remote filename from probe headers
///
/// Decision order:
/// 1. `content-disposition` filename parameter, quotes trimmed
/// 2. plain-text or zip `content-type`: last path segment of the URL
/// 3. otherwise the resource is not a candidate
///
/// The decided name must carry a recognized extension or the probe
/// yields `None`.
pub(crate) fn filename_from_headers(
    url: &str,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
) -> Option<String> {
    let filename = if let Some(disposition) = content_disposition {
        let (_, after) = disposition.rsplit_once("filename=")?;
        after.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
    } else {
        let content_type = content_type?;
        if !content_type.contains(TEXT_CONTENT_TYPE) && !content_type.contains(ZIP_CONTENT_TYPE) {
            return None;
        }
        let path = url.split(['?', '#']).next().unwrap_or(url);
        path.rsplit('/').next()?.to_string()
    };

    if classify::is_supported(&filename) {
        Some(filename)
    } else {
        None
    }
}
