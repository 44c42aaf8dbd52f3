//! Article title suggestions for the search popup, backed by the MediaWiki
//! OpenSearch API.
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::Url;
use reqwest::blocking::Client;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Queries shorter than this never hit the network
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Display text, e.g. "Rust (programming language)"
    pub label: String,
    /// Page title usable in the navigation token, e.g. "Rust_(programming_language)"
    pub title: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search returned HTTP {0}")]
    Status(u16),

    #[error("unexpected search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid search endpoint: {0}")]
    Endpoint(String),
}

pub trait SearchSource: Send + Sync {
    fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, SearchError>;
}

pub struct OpenSearchClient {
    client: Client,
    endpoint: String,
    limit: usize,
}

impl OpenSearchClient {
    pub fn new(endpoint: impl Into<String>, limit: usize, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            "wikipanes/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build().context("Failed to build search client")?,
            endpoint: endpoint.into(),
            limit,
        })
    }

    pub fn request_url(&self, query: &str) -> Result<Url, SearchError> {
        let limit = self.limit.to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("origin", "*"),
                ("action", "opensearch"),
                ("format", "json"),
                ("search", query),
                ("namespace", "0"),
                ("limit", limit.as_str()),
                ("formatversion", "2"),
            ],
        )
        .map_err(|e| SearchError::Endpoint(e.to_string()))
    }
}

impl SearchSource for OpenSearchClient {
    fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, SearchError> {
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }
        let url = self.request_url(query)?;
        debug!("Searching {url}");

        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }
        let body = response.text()?;
        parse_opensearch(&body)
    }
}

const ARTICLE_PATH: &str = "/wiki/";

/// Decodes `[query, [labels], [descriptions], [urls]]`. The page title of a
/// result is the URL path after `/wiki/` (or its last segment), percent-decoded.
pub fn parse_opensearch(body: &str) -> Result<Vec<Suggestion>, SearchError> {
    let (_query, labels, _descriptions, urls): (String, Vec<String>, Vec<String>, Vec<String>) =
        serde_json::from_str(body)?;

    Ok(labels
        .into_iter()
        .zip(urls)
        .map(|(label, url)| {
            let segment = match (url.find(ARTICLE_PATH), url.rfind('/')) {
                (Some(start), _) => &url[start + ARTICLE_PATH.len()..],
                (None, Some(slash)) => &url[slash + 1..],
                (None, None) => url.as_str(),
            };
            let title = urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            Suggestion { label, title }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_opensearch_response() {
        let body = r#"["rust",
            ["Rust", "Rust (programming language)"],
            ["", ""],
            ["https://en.wikipedia.org/wiki/Rust",
             "https://en.wikipedia.org/wiki/Rust_(programming_language)"]]"#;

        let suggestions = parse_opensearch(body).unwrap();
        assert_eq!(
            suggestions,
            vec![
                Suggestion {
                    label: "Rust".into(),
                    title: "Rust".into()
                },
                Suggestion {
                    label: "Rust (programming language)".into(),
                    title: "Rust_(programming_language)".into()
                },
            ]
        );
    }

    #[test]
    fn result_titles_are_percent_decoded() {
        let body = r#"["ac",
            ["AC/DC", "C++"],
            ["", ""],
            ["https://en.wikipedia.org/wiki/AC/DC",
             "https://en.wikipedia.org/wiki/C%2B%2B"]]"#;

        let titles: Vec<String> = parse_opensearch(body)
            .unwrap()
            .into_iter()
            .map(|suggestion| suggestion.title)
            .collect();
        assert_eq!(titles, ["AC/DC", "C++"]);
    }

    #[test]
    fn rejects_malformed_response() {
        assert!(matches!(
            parse_opensearch(r#"{"error": "nope"}"#),
            Err(SearchError::Decode(_))
        ));
    }

    #[test]
    fn short_queries_skip_the_network() {
        let client = OpenSearchClient::new("http://127.0.0.1:9/w/api.php", 6, None).unwrap();
        assert!(client.suggest("ca").unwrap().is_empty());
    }

    #[test]
    fn request_url_encodes_query() {
        let client = OpenSearchClient::new(DEFAULT_SEARCH_ENDPOINT, 6, None).unwrap();
        let url = client.request_url("cat & dog").unwrap();
        let query = url.query().unwrap();

        assert!(query.contains("action=opensearch"));
        assert!(query.contains("search=cat+%26+dog"));
        assert!(query.contains("limit=6"));
    }
}
