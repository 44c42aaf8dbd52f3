use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;

pub const DEFAULT_ARTICLE_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/html/";

const USER_AGENT: &str = concat!("wikipanes/", env!("CARGO_PKG_VERSION"));

/// Why a page could not be fetched.
///
/// Both variants show the same generic message to the user; the detail is
/// only written to the log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network response was not ok")]
    Status { status: u16 },

    #[error("Network response was not ok")]
    Transport { detail: String },
}

impl FetchError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    pub fn detail(&self) -> String {
        match self {
            FetchError::Status { status } => format!("HTTP status {status}"),
            FetchError::Transport { detail } => detail.clone(),
        }
    }
}

/// Where article HTML comes from. Implementations are called from worker
/// threads, one call per pane.
pub trait DocumentSource: Send + Sync {
    fn fetch_html(&self, title: &str) -> Result<String, FetchError>;
}

/// Fetches rendered article HTML over HTTP
pub struct HttpDocumentSource {
    client: Client,
    endpoint: String,
}

impl HttpDocumentSource {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The title is percent-encoded as a single path segment
    pub fn url_for(&self, title: &str) -> String {
        format!("{}{}", self.endpoint, urlencoding::encode(title))
    }
}

impl DocumentSource for HttpDocumentSource {
    fn fetch_html(&self, title: &str) -> Result<String, FetchError> {
        let url = self.url_for(title);
        debug!("Fetching {url}");

        let response = self.client.get(&url).send().map_err(|e| {
            warn!("Request for {url} failed: {e}");
            FetchError::transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Request for {url} returned {status}");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response.text().map_err(|e| {
            warn!("Reading body of {url} failed: {e}");
            FetchError::transport(e.to_string())
        })
    }
}
