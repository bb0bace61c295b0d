//! Error types for the scraper.

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Errors that can occur while building a client or talking to the engine.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// HTTP request or client construction failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured request header could not be encoded.
    #[error("Invalid request header: {0}")]
    InvalidHeader(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

/// Why a search run stopped before walking all result pages.
///
/// These are terminal for the run but are not `Err`s: the partial result
/// set accumulated so far is still returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    /// The HTTP transport failed (DNS, connect, TLS, timeout).
    Transport,
    /// The engine answered 429 Too Many Requests.
    RateLimited,
}

impl Abort {
    /// Stable string code for the abort reason.
    pub fn code(&self) -> &'static str {
        match self {
            Abort::Transport => "REQUESTS_EXCEPTION",
            Abort::RateLimited => "429_TOO_MANY_REQUESTS",
        }
    }
}
