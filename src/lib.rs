//! # gscrape
//!
//! A paginated Google result scraper that behaves like a browser session:
//! consistent headers and consent cookies, randomized inter-request
//! delays, rate-limit detection, and unwrapping of the engine's
//! `/url?...` redirect-wrapper links into their real destinations.
//!
//! The scraper walks result pages until a page stops contributing new
//! accepted links, the configured result cap is reached, or the engine
//! pushes back, and returns a deduplicated list of outbound URLs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gscrape::{query::params, ClientConfig, GoogleScraper};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new()
//!         .with_search_params(params(&[("q", "rust programming")]))
//!         .with_max_results(30);
//!
//!     let mut scraper = GoogleScraper::new(config)?;
//!     let outcome = scraper.search().await;
//!
//!     for url in &outcome.urls {
//!         println!("{}", url);
//!     }
//!     if !outcome.is_complete() {
//!         eprintln!("stopped early: {}", outcome.error_code());
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod extract;
mod fetcher;
mod search;
mod urls;
mod validate;

pub mod agent;
pub mod cookies;
pub mod query;

pub use config::{ClientConfig, DEFAULT_PAGE_SIZE};
pub use error::{Abort, Result, ScrapeError};
pub use extract::extract_links;
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher, FETCH_TIMEOUT, MAX_REDIRECTS};
pub use query::date_range_tbs;
pub use search::{GoogleScraper, SearchOutcome};
pub use urls::{build_url, PaginationCursor, UrlSet};
pub use validate::validate_link;
