//! Opening input streams from URLs, files, and stdin.
//!
//! Nothing here buffers a whole document: URLs yield a streaming
//! [`reqwest::Response`] that an [`crate::Extractor`] drains chunk by chunk,
//! and files are returned as readers.

use std::fs::File;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::SERVER;
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::error::{LadleError, Result};
use crate::event::EventHandler;
use crate::session::Traversal;

static HAS_SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z]+://").unwrap());

/// Statuses that, without an upstream `server` header, come from the fetch
/// infrastructure rather than from the target site.
const INFRASTRUCTURE_STATUSES: [u16; 5] = [400, 403, 502, 503, 530];

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; Ladle/0.1)".to_string() }
    }
}

/// Prefixes `http://` when the input has no `scheme://` part.
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    if HAS_SCHEME.is_match(input) { input.to_string() } else { format!("http://{}", input) }
}

/// Whether a response was produced by the fetch infrastructure instead of
/// the requested site.
pub fn is_infrastructure_failure(status: StatusCode, server: Option<&str>) -> bool {
    INFRASTRUCTURE_STATUSES.contains(&status.as_u16())
        && server.is_none_or(|server| server.eq_ignore_ascii_case("cloudflare"))
}

/// Sends a GET request and returns the response with its body unread.
///
/// Error statuses that belong to the target site are returned as normal
/// responses, since their body is still the site's own markup.
pub async fn open_url(url: &str, config: &FetchConfig) -> Result<Response> {
    let parsed_url = Url::parse(&normalize_url(url)).map_err(|e| LadleError::InvalidUrl(e.to_string()))?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(LadleError::HttpError)?;

    tracing::debug!(url = %parsed_url, "requesting page");

    let response = client
        .get(parsed_url.clone())
        .header("User-Agent", &config.user_agent)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| map_request_error(e, config))?;

    let status = response.status();
    let server = response.headers().get(SERVER).and_then(|value| value.to_str().ok());

    if is_infrastructure_failure(status, server) {
        return Err(LadleError::Upstream { status: status.as_u16(), url: parsed_url.to_string() });
    }

    tracing::debug!(status = status.as_u16(), "response headers received");
    Ok(response)
}

fn map_request_error(e: reqwest::Error, config: &FetchConfig) -> LadleError {
    if e.is_timeout() { LadleError::Timeout { timeout: config.timeout } } else { LadleError::HttpError(e) }
}

impl<H: EventHandler> Traversal<H> {
    /// Feeds a response body chunk by chunk as it arrives, then finishes.
    ///
    /// The body is always read to the end. Dropping the returned future
    /// drops the response and releases its connection.
    pub async fn drain_response(mut self, mut response: Response) -> Result<H> {
        while let Some(chunk) = response.chunk().await? {
            self.feed(&chunk)?;
        }
        self.finish()
    }
}

/// Opens a local file for streaming.
pub fn open_file(path: &str) -> Result<File> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(LadleError::FileNotFound(path_buf))
    } else {
        File::open(&path_buf).map_err(LadleError::from)
    }
}
