//! Engine URL construction and pagination.

use url::Url;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::query::{merge, ParamMap};
use crate::Result;

/// The three URLs a scraping session navigates between, precomputed once
/// at construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSet {
    /// Engine root, no query string.
    pub homepage: String,
    /// Search path carrying the homepage and search parameters combined.
    /// Used for the very first result request only, so the fingerprint
    /// matches a browser navigating off the landing page.
    pub homepage_search: String,
    /// Search path carrying the search parameters only.
    pub search: String,
}

impl UrlSet {
    /// Precomputes the session URLs from the configured parameter maps.
    pub fn new(tld: &str, homepage_params: &ParamMap, search_params: &ParamMap) -> Result<Self> {
        Ok(Self {
            homepage: build_url(tld, "/", &ParamMap::new())?,
            homepage_search: build_url(tld, "/search", &merge(homepage_params, search_params))?,
            search: build_url(tld, "/search", search_params)?,
        })
    }
}

/// Builds an absolute `https://www.google.<tld>` URL with a percent-encoded
/// query string. Multi-valued parameters repeat as separate `key=value`
/// pairs rather than being comma-joined.
pub fn build_url(tld: &str, path: &str, params: &ParamMap) -> Result<String> {
    let mut url = Url::parse(&format!("https://www.google.{}", tld))?;
    url.set_path(path);
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, values) in params {
            for value in values {
                pairs.append_pair(key, value);
            }
        }
    }
    Ok(url.into())
}

/// Tracks which slice of results to request next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Zero-based result offset of the next page.
    pub start: u32,
    /// Page size.
    pub num: u32,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            start: 0,
            num: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationCursor {
    /// Pulls `start` and `num` out of the search parameters.
    ///
    /// `start` always leaves the map. `num` leaves it only when it equals
    /// the engine default; a custom page size stays on the wire and still
    /// drives cursor advancement.
    pub fn extract(params: &mut ParamMap) -> Self {
        let mut cursor = Self::default();
        if let Some(values) = params.remove("start") {
            if let Some(start) = values.first().and_then(|v| v.parse().ok()) {
                cursor.start = start;
            }
        }
        if let Some(values) = params.get("num") {
            if let Some(num) = values.first().and_then(|v| v.parse().ok()) {
                // num is a positive page size
                cursor.num = std::cmp::max(num, 1);
            }
            if cursor.num == DEFAULT_PAGE_SIZE {
                params.remove("num");
            }
        }
        cursor
    }

    /// Returns the URL of the next page and advances the cursor.
    ///
    /// The first request reuses the homepage-flavored search URL; every
    /// later request appends the `start` offset to the bare search URL.
    /// The cursor advances on both branches.
    pub fn next_url(&mut self, urls: &UrlSet) -> String {
        let url = if self.start == 0 {
            urls.homepage_search.clone()
        } else {
            let sep = if urls.search.contains('?') { '&' } else { '?' };
            format!("{}{}start={}", urls.search, sep, self.start)
        };
        self.start += self.num;
        url
    }

    /// Rewinds the cursor to the first page.
    pub fn rewind(&mut self) {
        self.start = 0;
    }
}
