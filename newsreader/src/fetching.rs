use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::extraction::{ArticleRecord, ExtractError, Extractor};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Why an article could not be produced. The HTTP layer collapses all of
/// these into one message; the distinction is kept for logs and callers.
#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("invalid article url '{0}'")]
    InvalidUrl(String),
    #[error("network error fetching article: {0}")]
    Network(#[from] reqwest::Error),
    #[error("article fetch failed with status: {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

/// Downloads a page and runs the extractor over it.
pub struct ArticleFetcher {
    client: Client,
    extractor: Extractor,
}

impl ArticleFetcher {
    pub fn new(extractor: Extractor, timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client, extractor })
    }

    /// Fetch `url` once (no retries) and extract its article.
    pub async fn fetch_article(&self, url: &str) -> Result<ArticleRecord, ArticleError> {
        let parsed = Url::parse(url).map_err(|_| ArticleError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ArticleError::InvalidUrl(url.to_string()));
        }

        info!("fetching: {}", url);
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("fetching: {} answered {}", url, status);
            return Err(ArticleError::Status(status));
        }

        let html = response.text().await?;
        let record = self.extractor.extract(url, &html)?;
        info!(
            "fetching: extracted '{}' ({} chars) from {}",
            record.title,
            record.content.chars().count(),
            url
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionRules;

    fn fetcher() -> ArticleFetcher {
        let extractor = Extractor::new(&ExtractionRules::default()).unwrap();
        ArticleFetcher::new(extractor, 5, DEFAULT_USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let f = fetcher();
        assert!(matches!(
            f.fetch_article("not a url").await,
            Err(ArticleError::InvalidUrl(_))
        ));
        assert!(matches!(
            f.fetch_article("file:///etc/passwd").await,
            Err(ArticleError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_silent_server_hits_the_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever answering
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let extractor = Extractor::new(&ExtractionRules::default()).unwrap();
        let f = ArticleFetcher::new(extractor, 1, DEFAULT_USER_AGENT).unwrap();

        let started = std::time::Instant::now();
        let result = f.fetch_article(&format!("http://{}/article", addr)).await;
        let elapsed = started.elapsed();

        assert!(
            matches!(result, Err(ArticleError::Network(ref e)) if e.is_timeout()),
            "expected a timeout, got {:?}",
            result
        );
        assert!(elapsed >= Duration::from_millis(900));
        assert!(elapsed < Duration::from_secs(5));
        server.abort();
    }
}
