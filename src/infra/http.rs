//! `reqwest`-based transport.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::config::{ClientConfig, ContentType};
use crate::core::{BatchBundle, HttpResponse, QueryError, Transport};

/// HTTP transport over a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    content_type: ContentType,
}

impl ReqwestTransport {
    /// Build a transport with the headers, media type, and timeout of `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, QueryError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| QueryError::Config(format!("header `{name}`: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| QueryError::Config(format!("header `{name}` value: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            content_type: config.content_type,
        })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, content_type: ContentType) -> Self {
        Self {
            client,
            content_type,
        }
    }

    fn parse_url(url: &str) -> Result<reqwest::Url, QueryError> {
        reqwest::Url::parse(url).map_err(|e| QueryError::InvalidUrl(format!("{url}: {e}")))
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, QueryError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, QueryError> {
        let response = self
            .client
            .get(Self::parse_url(url)?)
            .header(ACCEPT, self.content_type.mime())
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        Self::read(response).await
    }

    async fn post_bundle(
        &self,
        url: &str,
        bundle: &BatchBundle,
    ) -> Result<HttpResponse, QueryError> {
        let body = serde_json::to_vec(bundle)?;
        tracing::trace!(url = %url, entries = bundle.entry.len(), "posting batch bundle");
        let response = self
            .client
            .post(Self::parse_url(url)?)
            .header(ACCEPT, self.content_type.mime())
            .header(CONTENT_TYPE, self.content_type.mime())
            .body(body)
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        Self::read(response).await
    }
}
