//! Page fetching over HTTP.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::{redirect, Client, Proxy};

use crate::cookies::{self, CookieMap};
use crate::{Result, ScrapeError};

/// Maximum redirect hops followed per request.
pub const MAX_REDIRECTS: usize = 10;

/// Total per-request timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One fetched page, before classification.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    /// Final HTTP status code.
    pub status: u16,
    /// Body text; only read for 200 responses.
    pub body: String,
    /// `name=value` pairs observed in `Set-Cookie` response headers.
    pub set_cookies: Vec<(String, String)>,
}

impl FetchedPage {
    /// Convenience constructor for a 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            set_cookies: Vec::new(),
        }
    }
}

/// Trait for fetching one result page.
///
/// The production implementation speaks HTTP via reqwest; tests substitute
/// scripted implementations to drive the search loop deterministically.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Sends a GET for `url`, attaching the session cookie snapshot.
    async fn fetch(&self, url: &str, cookies: &CookieMap) -> Result<FetchedPage>;
}

/// HTTP fetcher carrying a session's fixed request policy: default headers,
/// optional proxy, redirect cap, 30-second total timeout, and TLS
/// certificate verification disabled (interception proxies are a supported
/// debugging setup).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the given fixed headers and optional proxy.
    pub fn new(headers: &BTreeMap<String, String>, proxy: Option<&str>) -> Result<Self> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ScrapeError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ScrapeError::InvalidHeader(name.clone()))?;
            header_map.insert(header_name, header_value);
        }

        let mut builder = Client::builder()
            .default_headers(header_map)
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(FETCH_TIMEOUT);
        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cookie_jar: &CookieMap) -> Result<FetchedPage> {
        let mut request = self.client.get(url);
        if !cookie_jar.is_empty() {
            request = request.header(COOKIE, cookies::header_value(cookie_jar));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(cookies::parse_set_cookie)
            .collect();
        let body = if status == 200 {
            response.text().await?
        } else {
            String::new()
        };

        Ok(FetchedPage {
            status,
            body,
            set_cookies,
        })
    }
}
