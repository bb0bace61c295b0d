//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::query::{params, ParamMap};

/// The engine's default page size. A `num` equal to this is left off the
/// wire because the engine applies it anyway.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Configuration for a [`GoogleScraper`](crate::GoogleScraper).
///
/// Immutable once handed to the scraper; the only construction-time
/// mutation is the extraction of `start`/`num` out of the search
/// parameters into the pagination cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Top-level domain suffix of the engine (`www.google.<tld>`).
    pub tld: String,
    /// Query parameters sent only on the very first search request.
    pub homepage_params: ParamMap,
    /// Query parameters sent on every search request.
    pub search_params: ParamMap,
    /// Explicit user agent; empty means a random pick from the pool.
    pub user_agent: String,
    /// Proxy URL; empty means a direct connection.
    pub proxy: String,
    /// Stop paginating once the result set has reached this size.
    pub max_results: usize,
    /// Inclusive lower bound of the inter-request delay, in seconds.
    pub min_sleep: u64,
    /// Inclusive upper bound of the inter-request delay, in seconds.
    pub max_sleep: u64,
    /// Log request/response snapshots at debug level.
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tld: "com".to_string(),
            homepage_params: params(&[("btnK", "Google Search"), ("source", "hp")]),
            search_params: ParamMap::new(),
            user_agent: String::new(),
            proxy: String::new(),
            max_results: 100,
            min_sleep: 8,
            max_sleep: 18,
            debug: false,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with the stock defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine's top-level domain suffix.
    pub fn with_tld(mut self, tld: impl Into<String>) -> Self {
        self.tld = tld.into().to_lowercase();
        self
    }

    /// Replaces the homepage-only query parameters.
    pub fn with_homepage_params(mut self, params: ParamMap) -> Self {
        self.homepage_params = params;
        self
    }

    /// Replaces the search query parameters.
    pub fn with_search_params(mut self, params: ParamMap) -> Self {
        self.search_params = params;
        self
    }

    /// Pins an explicit user agent instead of a random pool pick.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Routes all requests through the given proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = proxy.into();
        self
    }

    /// Caps the size of the result set.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Sets the inclusive bounds of the randomized inter-request delay.
    pub fn with_sleep_bounds(mut self, min_sleep: u64, max_sleep: u64) -> Self {
        self.min_sleep = min_sleep;
        self.max_sleep = max_sleep;
        self
    }

    /// Enables verbose request/response snapshot logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
