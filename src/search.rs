//! Search orchestration.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Local;
use rand::Rng;
use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::agent;
use crate::config::ClientConfig;
use crate::cookies::{self, CookieMap};
use crate::error::Abort;
use crate::extract::extract_links;
use crate::fetcher::{HttpFetcher, PageFetcher};
use crate::urls::{PaginationCursor, UrlSet};
use crate::validate::validate_link;
use crate::Result;

/// Outcome of one `search()` run.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Accepted outbound URLs. Sorted case-insensitively when the run
    /// completed normally; insertion order when it aborted early.
    pub urls: Vec<String>,
    /// Why the run stopped early, if it did.
    pub abort: Option<Abort>,
}

impl SearchOutcome {
    /// True when the run walked its pages without transport or
    /// rate-limit trouble.
    pub fn is_complete(&self) -> bool {
        self.abort.is_none()
    }

    /// Wire-compatible error code; empty when the run completed.
    pub fn error_code(&self) -> &'static str {
        self.abort.map(|abort| abort.code()).unwrap_or("")
    }
}

/// Mutable state scoped to a single `search()` run.
struct Session {
    cookies: CookieMap,
    abort: Option<Abort>,
}

/// Paginated Google scraper.
///
/// One instance owns its pagination cursor, and the cursor is *not* reset
/// between runs: a second `search()` call continues from wherever the
/// previous run stopped, which is how callers scrape deeper into the
/// result list. Call [`rewind`](Self::rewind) to start from the first
/// page again.
///
/// Cookies and the abort state are per-run; each `search()` call starts
/// from a fresh session.
pub struct GoogleScraper {
    config: ClientConfig,
    urls: UrlSet,
    cursor: PaginationCursor,
    headers: BTreeMap<String, String>,
    fetcher: Arc<dyn PageFetcher>,
}

impl GoogleScraper {
    /// Creates a scraper with the HTTP fetcher implied by the configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let (config, cursor, urls, headers) = assemble(config)?;
        let proxy = (!config.proxy.is_empty()).then_some(config.proxy.as_str());
        let fetcher = Arc::new(HttpFetcher::new(&headers, proxy)?);
        Ok(Self {
            config,
            urls,
            cursor,
            headers,
            fetcher,
        })
    }

    /// Creates a scraper around an injected fetcher.
    ///
    /// This is the seam used by tests and by callers who bring their own
    /// transport; the configuration's proxy field is ignored here because
    /// the fetcher already embodies its transport policy.
    pub fn with_fetcher(config: ClientConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let (config, cursor, urls, headers) = assemble(config)?;
        Ok(Self {
            config,
            urls,
            cursor,
            headers,
            fetcher,
        })
    }

    /// Returns the precomputed session URLs.
    pub fn urls(&self) -> &UrlSet {
        &self.urls
    }

    /// Returns the current pagination cursor.
    pub fn cursor(&self) -> PaginationCursor {
        self.cursor
    }

    /// Rewinds pagination to the first result page.
    pub fn rewind(&mut self) {
        self.cursor.rewind();
    }

    /// Runs one search to completion.
    ///
    /// Fetches the homepage to seed cookies, applies the consent fix,
    /// then walks result pages until a page yields no accepted link, the
    /// result cap is reached, the body comes back empty, or the transport
    /// aborts the run.
    pub async fn search(&mut self) -> SearchOutcome {
        let mut session = Session {
            cookies: cookies::seed(),
            abort: None,
        };

        if self.config.debug {
            debug!(headers = %snapshot(&self.headers), "initial headers");
            debug!(cookies = %snapshot(&session.cookies), "initial cookies");
            debug!(proxy = %self.config.proxy, "proxy");
        }

        let mut urls: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        // Homepage first. The body is discarded; the navigation exists to
        // seed cookies and to look like a real first visit.
        let homepage = self.urls.homepage.clone();
        self.get_page(&homepage, &mut session).await;

        if session.abort.is_none() {
            self.adjust_consent(&mut session);

            loop {
                self.throttle().await;
                let page_url = self.cursor.next_url(&self.urls);
                let html = self.get_page(&page_url, &mut session).await;
                if session.abort.is_some() || html.is_empty() {
                    break;
                }

                let mut found = false;
                for raw in extract_links(&html) {
                    if let Some(link) = validate_link(&raw) {
                        found = true;
                        if seen.insert(link.clone()) {
                            urls.push(link);
                        }
                    }
                }

                // The cap is only checked between pages; a page is always
                // ingested whole.
                if !found || urls.len() >= self.config.max_results {
                    break;
                }
            }

            if session.abort.is_none() {
                urls.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
            }
        }

        SearchOutcome {
            urls,
            abort: session.abort,
        }
    }

    /// Fetches one page and classifies the outcome into the session.
    async fn get_page(&self, url: &str, session: &mut Session) -> String {
        debug!(%url, "request");
        match self.fetcher.fetch(url, &session.cookies).await {
            Ok(page) => {
                debug!(status = page.status, "response");
                cookies::absorb(&mut session.cookies, &page.set_cookies);
                match page.status {
                    200 => page.body,
                    429 => {
                        warn!("rate limited by the engine");
                        session.abort = Some(Abort::RateLimited);
                        String::new()
                    }
                    // Other statuses read as "no results on this page",
                    // not as a failure.
                    _ => String::new(),
                }
            }
            Err(err) => {
                warn!(error = %err, "transport failure");
                session.abort = Some(Abort::Transport);
                String::new()
            }
        }
    }

    /// Applies the legacy consent-cookie fix, once, before pagination.
    fn adjust_consent(&self, session: &mut Session) {
        let today = Local::now().date_naive();
        if let Some(updated) = cookies::updated_consent(&session.cookies, today) {
            debug!("pending CONSENT cookie rewritten to its accepted form");
            if self.config.debug {
                debug!(cookies = %snapshot(&updated), "updated cookies");
            }
            session.cookies = updated;
        }
    }

    /// Sleeps a random whole number of seconds within the configured
    /// bounds. Cooperative self-throttling between page fetches.
    async fn throttle(&self) {
        let (min, max) = (self.config.min_sleep, self.config.max_sleep);
        let secs = if min >= max {
            min
        } else {
            rand::thread_rng().gen_range(min..=max)
        };
        if secs > 0 {
            sleep(Duration::from_secs(secs)).await;
        }
    }
}

/// Splits a configuration into the pieces a scraper owns: the cleaned
/// config, the pagination cursor extracted from its search parameters,
/// the precomputed URL set, and the fixed request headers.
fn assemble(
    mut config: ClientConfig,
) -> Result<(
    ClientConfig,
    PaginationCursor,
    UrlSet,
    BTreeMap<String, String>,
)> {
    let cursor = PaginationCursor::extract(&mut config.search_params);
    let urls = UrlSet::new(&config.tld, &config.homepage_params, &config.search_params)?;
    let headers = request_headers(&config, &urls);
    Ok((config, cursor, urls, headers))
}

/// Fixed request headers of a session, presented like a browser that
/// navigated in from the engine homepage.
fn request_headers(config: &ClientConfig, urls: &UrlSet) -> BTreeMap<String, String> {
    let user_agent = if config.user_agent.is_empty() {
        agent::random()
    } else {
        config.user_agent.clone()
    };
    BTreeMap::from([
        ("User-Agent".to_string(), user_agent),
        ("Accept-Language".to_string(), "en-US, *".to_string()),
        ("Accept".to_string(), "*/*".to_string()),
        ("Referer".to_string(), urls.homepage.clone()),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
    ])
}

fn snapshot<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "<unserializable>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchedPage;
    use crate::query::params;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a scripted sequence of fetch outcomes and records every
    /// request URL and the cookie snapshot it was sent with.
    struct ScriptedFetcher {
        script: Mutex<Vec<Result<FetchedPage>>>,
        requests: Mutex<Vec<(String, CookieMap)>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<FetchedPage>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<(String, CookieMap)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str, cookies: &CookieMap) -> Result<FetchedPage> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), cookies.clone()));
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                // Script exhausted: an empty 200 ends the loop.
                Ok(FetchedPage::ok(""))
            } else {
                script.remove(0)
            }
        }
    }

    fn page_with_links(links: &[&str]) -> FetchedPage {
        let anchors: String = links
            .iter()
            .map(|link| format!(r#"<a href="/url?q={}&sa=U">r</a>"#, link))
            .collect();
        FetchedPage::ok(format!(r#"<html><body><div id="search">{}</div></body></html>"#, anchors))
    }

    fn config() -> ClientConfig {
        ClientConfig::new()
            .with_search_params(params(&[("q", "rust")]))
            .with_user_agent("test-agent")
            .with_sleep_bounds(0, 0)
    }

    fn status_page(status: u16) -> FetchedPage {
        FetchedPage {
            status,
            ..FetchedPage::default()
        }
    }

    #[tokio::test]
    async fn test_search_collects_and_sorts_results() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(page_with_links(&["http://zebra.example/", "http://Alpha.example/"])),
            Ok(FetchedPage::ok("<html><body><div id=\"search\"></div></body></html>")),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher).unwrap();
        let outcome = scraper.search().await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.error_code(), "");
        assert_eq!(
            outcome.urls,
            vec!["http://Alpha.example/", "http://zebra.example/"]
        );
    }

    #[tokio::test]
    async fn test_search_dedupes_across_pages() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(page_with_links(&["http://same.example/", "http://one.example/"])),
            Ok(page_with_links(&["http://same.example/", "http://two.example/"])),
            Ok(FetchedPage::ok("<div id=\"search\"></div>")),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher).unwrap();
        let outcome = scraper.search().await;

        assert_eq!(outcome.urls.len(), 3);
        assert_eq!(
            outcome
                .urls
                .iter()
                .filter(|u| u.as_str() == "http://same.example/")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_search_stops_on_page_without_accepted_links() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(page_with_links(&["http://one.example/"])),
            // Page renders but holds only internal navigation.
            Ok(FetchedPage::ok(
                r#"<div id="search"><a href="/search?q=related">more</a></div>"#,
            )),
            Ok(page_with_links(&["http://never.example/"])),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher.clone()).unwrap();
        let outcome = scraper.search().await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.urls, vec!["http://one.example/"]);
        // Homepage + page 1 + page 2; the scripted page 3 is never fetched.
        assert_eq!(fetcher.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_search_cap_checked_between_pages_only() {
        let page1: Vec<String> = (0..10).map(|i| format!("http://p1-{}.example/", i)).collect();
        let refs: Vec<&str> = page1.iter().map(String::as_str).collect();
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(page_with_links(&refs)),
            Ok(page_with_links(&["http://never.example/"])),
        ]);
        let mut scraper =
            GoogleScraper::with_fetcher(config().with_max_results(5), fetcher.clone()).unwrap();
        let outcome = scraper.search().await;

        // The whole first page lands even though the cap is 5.
        assert_eq!(outcome.urls.len(), 10);
        // Homepage + one result page.
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_search_rate_limited_returns_partial_unsorted() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(page_with_links(&["http://zebra.example/", "http://alpha.example/"])),
            Ok(status_page(429)),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher).unwrap();
        let outcome = scraper.search().await;

        assert!(!outcome.is_complete());
        assert_eq!(outcome.abort, Some(Abort::RateLimited));
        assert_eq!(outcome.error_code(), "429_TOO_MANY_REQUESTS");
        // Insertion order, not sorted: zebra was scraped first.
        assert_eq!(
            outcome.urls,
            vec!["http://zebra.example/", "http://alpha.example/"]
        );
    }

    #[tokio::test]
    async fn test_search_rate_limited_on_first_page_is_empty() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(status_page(429)),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher).unwrap();
        let outcome = scraper.search().await;

        assert!(outcome.urls.is_empty());
        assert_eq!(outcome.error_code(), "429_TOO_MANY_REQUESTS");
    }

    #[tokio::test]
    async fn test_search_aborts_on_homepage_transport_failure() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(crate::ScrapeError::Other("connection refused".to_string())),
            Ok(page_with_links(&["http://never.example/"])),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher.clone()).unwrap();
        let outcome = scraper.search().await;

        assert_eq!(outcome.abort, Some(Abort::Transport));
        assert_eq!(outcome.error_code(), "REQUESTS_EXCEPTION");
        assert!(outcome.urls.is_empty());
        // Nothing after the homepage is fetched.
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_search_treats_other_statuses_as_empty_page() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(status_page(503)),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher).unwrap();
        let outcome = scraper.search().await;

        // Soft stop: no results, but no error either.
        assert!(outcome.is_complete());
        assert!(outcome.urls.is_empty());
    }

    #[tokio::test]
    async fn test_search_first_request_uses_homepage_search_url() {
        let fetcher = ScriptedFetcher::new(vec![Ok(FetchedPage::ok("homepage"))]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher.clone()).unwrap();
        let homepage_search = scraper.urls().homepage_search.clone();
        let homepage = scraper.urls().homepage.clone();
        scraper.search().await;

        let requests = fetcher.requests();
        assert_eq!(requests[0].0, homepage);
        assert_eq!(requests[1].0, homepage_search);
        assert!(requests[1].0.contains("btnK"));
    }

    #[tokio::test]
    async fn test_search_sends_seed_cookie() {
        let fetcher = ScriptedFetcher::new(vec![Ok(FetchedPage::ok("homepage"))]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher.clone()).unwrap();
        scraper.search().await;

        let requests = fetcher.requests();
        assert!(requests[0].1.contains_key("SOCS"));
    }

    #[tokio::test]
    async fn test_search_rewrites_pending_consent_cookie() {
        let homepage = FetchedPage {
            status: 200,
            body: "homepage".to_string(),
            set_cookies: vec![("CONSENT".to_string(), "PENDING+123".to_string())],
        };
        let fetcher = ScriptedFetcher::new(vec![
            Ok(homepage),
            Ok(page_with_links(&["http://one.example/"])),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher.clone()).unwrap();
        scraper.search().await;

        let requests = fetcher.requests();
        let consent = requests[1].1.get("CONSENT").cloned().unwrap();
        assert!(consent.starts_with("YES+shp.gws-"), "got: {}", consent);
        assert!(consent.ends_with("+FX+123"), "got: {}", consent);
    }

    #[tokio::test]
    async fn test_search_cursor_continues_across_calls() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(page_with_links(&["http://one.example/"])),
            Ok(FetchedPage::ok("<div id=\"search\"></div>")),
            // Second run.
            Ok(FetchedPage::ok("homepage")),
            Ok(FetchedPage::ok("<div id=\"search\"></div>")),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher.clone()).unwrap();
        scraper.search().await;
        let after_first = scraper.cursor().start;
        assert_eq!(after_first, 20);

        scraper.search().await;
        let requests = fetcher.requests();
        // The second run's first page request carries the continued offset.
        let second_run_page = &requests[4].0;
        assert!(
            second_run_page.contains("start=20"),
            "got: {}",
            second_run_page
        );
    }

    #[tokio::test]
    async fn test_search_rewind_restarts_pagination() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(FetchedPage::ok("homepage")),
            Ok(page_with_links(&["http://one.example/"])),
            Ok(FetchedPage::ok("<div id=\"search\"></div>")),
            // Second run.
            Ok(FetchedPage::ok("homepage")),
            Ok(FetchedPage::ok("<div id=\"search\"></div>")),
        ]);
        let mut scraper = GoogleScraper::with_fetcher(config(), fetcher.clone()).unwrap();
        scraper.search().await;
        scraper.rewind();
        scraper.search().await;

        let requests = fetcher.requests();
        let homepage_search = scraper.urls().homepage_search.clone();
        assert_eq!(requests[4].0, homepage_search);
    }

    #[test]
    fn test_request_headers_pin_configured_agent() {
        let config = config();
        let urls = UrlSet::new("com", &config.homepage_params, &config.search_params).unwrap();
        let headers = request_headers(&config, &urls);
        assert_eq!(headers.get("User-Agent").map(String::as_str), Some("test-agent"));
        assert_eq!(headers.get("Referer").map(String::as_str), Some("https://www.google.com/"));
        assert_eq!(
            headers.get("Upgrade-Insecure-Requests").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_request_headers_fall_back_to_pool() {
        let config = ClientConfig::new();
        let urls = UrlSet::new("com", &config.homepage_params, &config.search_params).unwrap();
        let headers = request_headers(&config, &urls);
        let agent = headers.get("User-Agent").unwrap();
        assert!(crate::agent::all().contains(agent));
    }

    #[test]
    fn test_outcome_default() {
        let outcome = SearchOutcome::default();
        assert!(outcome.is_complete());
        assert!(outcome.urls.is_empty());
        assert_eq!(outcome.error_code(), "");
    }
}
