//! Validation and unwrapping of raw result links.

use url::Url;

/// Ceiling on recursive unwrapping; deeper or cyclic wrappers are rejected.
const MAX_UNWRAP_DEPTH: usize = 5;

/// Query keys the engine uses to carry the real destination.
const UNWRAP_KEYS: [&str; 3] = ["q", "u", "link"];

/// Base for resolving relative hrefs such as `/url?q=...`.
const RESOLVE_BASE: &str = "https://www.google.com/";

/// Normalizes a raw href into an accepted outbound URL.
///
/// Links whose host is neither Google-owned nor a `goo.gl` shortener are
/// accepted and returned as absolute URLs. Everything else is treated as a
/// potential redirect wrapper: the `q`/`u`/`link` query values are
/// unwrapped recursively until one resolves to an external destination.
/// Internal navigation, shortener links, and wrappers that never resolve
/// are rejected with `None`.
pub fn validate_link(raw: &str) -> Option<String> {
    validate_at_depth(raw, 0)
}

fn validate_at_depth(raw: &str, depth: usize) -> Option<String> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }

    // Relative references resolve against the engine base, which lands
    // them in the unwrap branch below.
    let base = Url::parse(RESOLVE_BASE).expect("valid base URL");
    let url = Url::options().base_url(Some(&base)).parse(raw).ok()?;

    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    let external = !host.is_empty()
        && !host.contains("google")
        && !scheme.contains("google")
        && !host.ends_with("goo.gl");
    if external {
        return Some(url.into());
    }

    for (key, value) in url.query_pairs() {
        if UNWRAP_KEYS.contains(&key.as_ref()) && !value.is_empty() {
            if let Some(unwrapped) = validate_at_depth(&value, depth + 1) {
                return Some(unwrapped);
            }
        }
    }
    None
}
