//! Content hashing for ordered-queue deduplication.
//!
//! An ordered destination suppresses entries whose deduplication id it has
//! already seen inside its dedup window. The id is the SHA-256 of the job
//! body in canonical JSON form (object keys sorted at every depth, compact
//! separators), so two bodies with the same content always hash the same
//! regardless of how they were assembled.

use std::collections::BTreeSet;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::job::JobBody;

/// Returns `value` as canonical JSON: object keys sorted recursively, no whitespace.
///
/// # Examples
///
/// ```
/// use drover_core::hash::canonical_json;
/// use serde_json::json;
///
/// assert_eq!(canonical_json(&json!({"b": 1, "a": [{"d": 2, "c": 3}]})),
///            r#"{"a":[{"c":3,"d":2}],"b":1}"#);
/// ```
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, inner)| (key.clone(), canonicalize(inner)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Lowercase hex SHA-256 digest of a string.
///
/// # Examples
///
/// ```
/// use drover_core::hash::sha256_hex;
///
/// assert_eq!(
///     sha256_hex(""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Deduplication id of a job body with the `excluded` keys removed.
#[must_use]
pub fn deduplication_id(body: &JobBody, excluded: &BTreeSet<String>) -> String {
    let retained: JobBody = body
        .iter()
        .filter(|(key, _)| !excluded.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    sha256_hex(&canonical_json(&Value::Object(retained)))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn body(value: Value) -> JobBody {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test bodies are objects"),
        }
    }

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let value = json!({"z": {"y": 1, "x": 2}, "a": null});
        assert_eq!(canonical_json(&value), r#"{"a":null,"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn canonical_json_keeps_array_order() {
        assert_eq!(canonical_json(&json!([3, 1, 2])), "[3,1,2]");
    }

    #[test]
    fn dedup_id_is_64_hex_chars() {
        let id = deduplication_id(&body(json!({"a": 1})), &BTreeSet::new());
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn dedup_id_ignores_excluded_keys() {
        let excluded = keys(&["job_id", "enqueued_at"]);
        let a = body(json!({"job_id": "1", "enqueued_at": 10, "arguments": ["x"]}));
        let b = body(json!({"job_id": "2", "enqueued_at": 99, "arguments": ["x"]}));
        assert_eq!(deduplication_id(&a, &excluded), deduplication_id(&b, &excluded));
    }

    #[test]
    fn dedup_id_changes_with_retained_keys() {
        let excluded = keys(&["job_id"]);
        let a = body(json!({"job_id": "1", "arguments": ["x"]}));
        let b = body(json!({"job_id": "1", "arguments": ["y"]}));
        assert_ne!(deduplication_id(&a, &excluded), deduplication_id(&b, &excluded));
    }

    #[test]
    fn dedup_id_equals_hash_of_filtered_canonical_body() {
        let excluded = keys(&["job_id"]);
        let full = body(json!({"job_id": "1", "b": 2, "a": 1}));
        assert_eq!(
            deduplication_id(&full, &excluded),
            sha256_hex(r#"{"a":1,"b":2}"#)
        );
    }

    proptest! {
        #[test]
        fn excluded_field_never_changes_dedup_id(
            job_id in "[a-z0-9-]{1,36}",
            other_id in "[a-z0-9-]{1,36}",
            arg in any::<i64>(),
        ) {
            let excluded = keys(&["job_id"]);
            let a = body(json!({"job_id": job_id, "arguments": [arg]}));
            let b = body(json!({"job_id": other_id, "arguments": [arg]}));
            prop_assert_eq!(deduplication_id(&a, &excluded), deduplication_id(&b, &excluded));
        }

        #[test]
        fn retained_field_changes_dedup_id(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            let excluded = keys(&["job_id"]);
            let left = body(json!({"job_id": "same", "arguments": [a]}));
            let right = body(json!({"job_id": "same", "arguments": [b]}));
            prop_assert_ne!(deduplication_id(&left, &excluded), deduplication_id(&right, &excluded));
        }
    }
}
