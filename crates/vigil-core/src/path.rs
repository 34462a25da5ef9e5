//! Dotted path helpers.
//!
//! Paths address fields of a nested model, e.g. `address.city` or
//! `children.0.name`. Array elements are addressed by their index.

use serde_json::Value;

/// Split a path into its non-empty segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

/// Append a field to a parent path.
pub fn join(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// Split a path into its parent path and last segment.
///
/// ```
/// use vigil_core::path::split_last;
///
/// assert_eq!(split_last("address.city"), (Some("address"), "city"));
/// assert_eq!(split_last("name"), (None, "name"));
/// ```
pub fn split_last(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parent, field)) if !parent.is_empty() => (Some(parent), field),
        Some((_, field)) => (None, field),
        None => (None, path),
    }
}

/// Resolve a path against a plain JSON value.
///
/// An empty path resolves to the value itself. Resolution stops with `None`
/// at the first missing or `null` member.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments(path) {
        current = member(current, segment)?;
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// Resolve a single member of an object or array.
pub fn member<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn join_skips_empty_parent() {
        assert_eq!(join("", "name"), "name");
        assert_eq!(join("address", "city"), "address.city");
    }

    #[test]
    fn segments_ignore_empty_parts() {
        let parts: Vec<_> = segments(".a..b.").collect();
        assert_eq!(parts, vec!["a", "b"]);
    }

    #[test]
    fn lookup_nested_object_and_array() {
        let value = json!({
            "address": { "city": "Berlin" },
            "children": [{ "name": "Ada" }, { "name": "Alan" }]
        });

        assert_eq!(lookup(&value, "address.city"), Some(&json!("Berlin")));
        assert_eq!(lookup(&value, "children.1.name"), Some(&json!("Alan")));
        assert_eq!(lookup(&value, ""), Some(&value));
        assert_eq!(lookup(&value, "children.5.name"), None);
        assert_eq!(lookup(&value, "address.zip"), None);
    }

    #[test]
    fn lookup_stops_at_null() {
        let value = json!({ "address": null });
        assert_eq!(lookup(&value, "address.city"), None);
        assert_eq!(lookup(&value, "address"), None);
    }

    fn build(segments: &[String], leaf: Value) -> Value {
        segments.iter().rev().fold(leaf, |acc, segment| {
            let mut map = serde_json::Map::new();
            map.insert(segment.clone(), acc);
            Value::Object(map)
        })
    }

    proptest! {
        #[test]
        fn lookup_finds_what_was_built(
            parts in proptest::collection::vec("[a-z]{1,8}", 1..6),
            leaf in "[a-zA-Z0-9 ]{0,20}",
        ) {
            let value = build(&parts, json!(leaf));
            let path = parts.iter().fold(String::new(), |acc, p| join(&acc, p));

            prop_assert_eq!(lookup(&value, &path), Some(&json!(leaf)));

            let (parent, last) = split_last(&path);
            prop_assert_eq!(last, parts.last().unwrap().as_str());
            prop_assert_eq!(parent.is_some(), parts.len() > 1);
        }
    }
}
