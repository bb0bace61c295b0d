//! Query-parameter maps and search modifiers.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Multi-valued query-parameter map. Every value of a key is sent as its
/// own `key=value` pair on the wire.
pub type ParamMap = BTreeMap<String, Vec<String>>;

/// Builds a `ParamMap` from single-valued pairs.
pub fn params(pairs: &[(&str, &str)]) -> ParamMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), vec![value.to_string()]))
        .collect()
}

/// Merges homepage and search parameters; search values win on key collision.
pub fn merge(homepage: &ParamMap, search: &ParamMap) -> ParamMap {
    let mut merged = homepage.clone();
    for (key, values) in search {
        merged.insert(key.clone(), values.clone());
    }
    merged
}

/// Formats a date-range restriction for the engine's `tbs` query parameter.
///
/// Open ends stay empty: `date_range_tbs(None, None)` is `"cdr:1,cd_min:,cd_max:"`.
pub fn date_range_tbs(date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> String {
    let fmt = |date: Option<NaiveDate>| {
        date.map(|d| d.format("%m/%d/%Y").to_string())
            .unwrap_or_default()
    };
    format!("cdr:1,cd_min:{},cd_max:{}", fmt(date_from), fmt(date_to))
}
