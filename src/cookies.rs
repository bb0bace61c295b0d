//! Session cookie handling.
//!
//! Cookies live in a plain snapshot map instead of a client-owned jar so
//! the consent adjustment stays a pure function over the snapshot.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use regex::Regex;

/// Cookie snapshot sent with every request of a session.
pub type CookieMap = BTreeMap<String, String>;

/// Name of the legacy consent cookie the engine hands out to EU egress IPs.
pub const CONSENT_COOKIE: &str = "CONSENT";

/// The `SOCS` cookie rejects all tracking under the current consent
/// mechanism. Valid for 13 months, created on 2024-09-23.
pub const SOCS_COOKIE: (&str, &str) = (
    "SOCS",
    "CAESHAgCEhJnd3NfMjAyNDA5MjMtMF9SQzEaAmRlIAEaBgiApc23Bg",
);

/// Seeds the cookie map for a fresh session.
pub fn seed() -> CookieMap {
    let mut cookies = CookieMap::new();
    cookies.insert(SOCS_COOKIE.0.to_string(), SOCS_COOKIE.1.to_string());
    cookies
}

/// Renders the snapshot as a `Cookie` request-header value.
pub fn header_value(cookies: &CookieMap) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Folds observed `Set-Cookie` pairs into the snapshot.
pub fn absorb(cookies: &mut CookieMap, set_cookies: &[(String, String)]) {
    for (name, value) in set_cookies {
        cookies.insert(name.clone(), value.clone());
    }
}

/// Parses the `name=value` head of a raw `Set-Cookie` header value,
/// discarding attributes such as `Path` and `Expires`.
pub fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let head = raw.split(';').next()?;
    let (name, value) = head.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Rewrites a pending legacy `CONSENT` cookie to its accepted form.
///
/// A `CONSENT=PENDING+<id>` cookie makes the engine serve the consent
/// interstitial instead of results. The rewrite keeps the numeric suffix
/// and stamps today's date into the accepted value. Returns the full
/// replacement snapshot when a rewrite happened, `None` when the cookie is
/// absent or already accepted.
pub fn updated_consent(cookies: &CookieMap, today: NaiveDate) -> Option<CookieMap> {
    let value = cookies.get(CONSENT_COOKIE)?;
    let pending = Regex::new(r"(?i)PENDING\+\d+").expect("valid consent pattern");
    if !pending.is_match(value) {
        return None;
    }
    let id = value.split_once('+').map(|(_, rest)| rest).unwrap_or_default();
    let mut updated = cookies.clone();
    updated.insert(
        CONSENT_COOKIE.to_string(),
        format!("YES+shp.gws-{}-0-RC1.en+FX+{}", today.format("%Y%m%d"), id),
    );
    Some(updated)
}
