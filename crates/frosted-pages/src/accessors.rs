//! Typed reads of page metadata.
//!
//! Every lookup tries the key as given, then lowercased, then uppercased, so
//! `Title`, `title` and `TITLE` are interchangeable in source files.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use frosted_md::Meta;
use serde_json::Value;

/// Look up a key: exact spelling first, then lowercase, then uppercase.
pub fn lookup<'m>(meta: &'m Meta, key: &str) -> Option<&'m Value> {
    meta.get(key)
        .or_else(|| meta.get(&key.to_lowercase()))
        .or_else(|| meta.get(&key.to_uppercase()))
}

/// String field. Numbers and booleans are rendered as text.
pub fn string(meta: &Meta, key: &str) -> Option<String> {
    match lookup(meta, key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Boolean field. Only a real boolean counts; `"true"` does not.
pub fn boolean(meta: &Meta, key: &str) -> Option<bool> {
    lookup(meta, key)?.as_bool()
}

/// String list field; anything that cannot be read as a list is empty.
pub fn string_list(meta: &Meta, key: &str) -> Vec<String> {
    lookup(meta, key)
        .and_then(ToStringList::to_string_list)
        .unwrap_or_default()
}

/// Timestamp field, either a date string or Unix seconds.
pub fn timestamp(meta: &Meta, key: &str) -> Option<DateTime<Utc>> {
    match lookup(meta, key)? {
        Value::String(s) => parse_time(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

/// Values that can be read as a list of strings.
pub trait ToStringList {
    fn to_string_list(&self) -> Option<Vec<String>>;
}

impl ToStringList for Value {
    fn to_string_list(&self) -> Option<Vec<String>> {
        match self {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Value::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or
/// `YYYY-MM-DD`. Zone-less times are taken as UTC.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn meta(value: Value) -> Meta {
        match value {
            Value::Object(map) => map,
            _ => panic!("test meta must be an object"),
        }
    }

    #[test]
    fn falls_back_through_key_cases() {
        let m = meta(json!({"title": "lower", "TAGS": "a"}));

        assert_eq!(string(&m, "Title").as_deref(), Some("lower"));
        assert_eq!(string_list(&m, "Tags"), vec!["a"]);
        assert_eq!(string(&m, "Missing"), None);
    }

    #[test]
    fn exact_key_wins() {
        let m = meta(json!({"Title": "exact", "title": "lower", "TITLE": "upper"}));

        assert_eq!(string(&m, "Title").as_deref(), Some("exact"));
    }

    #[test]
    fn booleans_are_not_coerced() {
        let m = meta(json!({"Unlisted": "true", "draft": true}));

        assert_eq!(boolean(&m, "Unlisted"), None);
        assert_eq!(boolean(&m, "Draft"), Some(true));
    }

    #[test]
    fn coerces_string_lists() {
        let m = meta(json!({
            "Native": ["rust", "web"],
            "Comma": " rust, web ,, ",
            "Numbers": [1, 2.5],
            "Mixed": ["a", true],
            "Object": {"a": 1}
        }));

        assert_eq!(string_list(&m, "Native"), vec!["rust", "web"]);
        assert_eq!(string_list(&m, "Comma"), vec!["rust", "web"]);
        assert_eq!(string_list(&m, "Numbers"), vec!["1", "2.5"]);
        assert!(string_list(&m, "Mixed").is_empty());
        assert!(string_list(&m, "Object").is_empty());
        assert!(string_list(&m, "Missing").is_empty());
    }

    #[test]
    fn parses_time_formats() {
        let midnight = Utc.with_ymd_and_hms(2021, 4, 16, 0, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2021, 4, 16, 18, 30, 0).unwrap();

        assert_eq!(parse_time("2021-04-16"), Some(midnight));
        assert_eq!(parse_time("2021-04-16 18:30:00"), Some(evening));
        assert_eq!(parse_time("2021-04-16T18:30:00"), Some(evening));
        assert_eq!(parse_time("2021-04-16T20:30:00+02:00"), Some(evening));
        assert_eq!(parse_time("last tuesday"), None);
    }

    #[test]
    fn reads_unix_timestamps() {
        let m = meta(json!({"Created": 86400}));

        assert_eq!(
            timestamp(&m, "Created"),
            Some(Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap())
        );
    }
}
