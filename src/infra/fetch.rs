//! Upstream HTTP fetch adapter.
//!
//! The upstream host rejects requests that do not look like a browser page
//! load, so every fetch carries the full accept/locale/referer/user-agent
//! header set. No retries; a failed fetch surfaces to the request boundary.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamSettings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure fetching `{url}`: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upstream returned status {status} for `{url}`")]
    Status { url: String, status: u16 },
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Retrieval of plain-text payloads from the upstream host.
///
/// `encode_referer` selects between the URL-encoded album URL (mapping
/// script fetch) and the raw form (metadata fetch).
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch_text(
        &self,
        url: &str,
        referer: &str,
        encode_referer: bool,
    ) -> Result<String, FetchError>;
}

pub struct HttpUpstreamFetcher {
    client: Client,
    accept_language: String,
    user_agent: String,
}

impl HttpUpstreamFetcher {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            accept_language: settings.accept_language.clone(),
            user_agent: settings.user_agent.clone(),
        })
    }
}

/// Percent-encode a referer URL through `Url` normalization. Unparseable
/// values pass through untouched.
fn encoded_referer(referer: &str) -> String {
    Url::parse(referer)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| referer.to_string())
}

#[async_trait]
impl UpstreamFetcher for HttpUpstreamFetcher {
    async fn fetch_text(
        &self,
        url: &str,
        referer: &str,
        encode_referer: bool,
    ) -> Result<String, FetchError> {
        let referer = if encode_referer {
            encoded_referer(referer)
        } else {
            referer.to_string()
        };

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "*/*")
            .header(header::ACCEPT_LANGUAGE, &self.accept_language)
            .header(header::REFERER, referer)
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referer_encoding_escapes_non_uri_characters() {
        assert_eq!(
            encoded_referer("https://example.net/álbum fotos-12.html"),
            "https://example.net/%C3%A1lbum%20fotos-12.html"
        );
    }

    #[test]
    fn referer_encoding_leaves_unparseable_values_alone() {
        assert_eq!(encoded_referer("not a url"), "not a url");
    }
}
