//! Link extraction from result-page HTML.

use scraper::{ElementRef, Html, Selector};

/// Container ids skipped by the fallback strategy; they hold engine chrome
/// and navigation, not results.
const CHROME_IDS: [&str; 3] = ["gbar", "top_nav", "searchform"];

/// Extracts the raw `href` values of candidate anchors from a result page.
///
/// Primary strategy: every anchor inside the `#search` results container.
/// Fallback when that container is missing (markup drift): every anchor in
/// the document that is not inside one of the known chrome subtrees.
///
/// Hrefs come back in document order; duplicates are possible.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("valid selector");
    let container = Selector::parse("#search").expect("valid selector");

    if let Some(search) = document.select(&container).next() {
        search.select(&anchors).filter_map(href).collect()
    } else {
        document
            .select(&anchors)
            .filter(|anchor| !inside_chrome(anchor))
            .filter_map(href)
            .collect()
    }
}

fn href(anchor: ElementRef) -> Option<String> {
    anchor.value().attr("href").map(str::to_string)
}

fn inside_chrome(anchor: &ElementRef) -> bool {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|element| {
            element
                .value()
                .id()
                .is_some_and(|id| CHROME_IDS.contains(&id))
        })
}
