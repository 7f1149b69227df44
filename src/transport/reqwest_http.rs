//! Blocking HTTP transport backed by `reqwest`.

use super::{HttpResponse, HttpTransport};
use crate::error::{FeedError, Result};
use reqwest::header::{ACCEPT, LINK};
use std::time::Duration;

/// Settings for [`ReqwestTransport`].
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Per-request timeout.
    /// Default: 30s
    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("feedsync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`HttpTransport`] using a blocking `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| FeedError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| FeedError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .map_err(|e| FeedError::transport(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, link, body })
    }
}
