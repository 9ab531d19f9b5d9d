// src/repair.rs
// Repair quasi-JSON fragments lifted out of script blocks.
//
// The source pages embed organization data as object literals inside script
// strings, and the serialization is sloppy: `undefined` placeholders,
// booleans quoted as strings, trailing commas, bodies without enclosing
// braces. Normalize all of that, then hand the result to serde_json.
//
// Both entry points share the same normalization pass so a fragment repairs
// identically whether it arrives as a whole object or a single entry.

use serde_json::{Map, Value};

use crate::error::MalformedFragment;

/// Normalization rules, applied in order:
/// 1. `undefined` sentinel → `null`
/// 2. string-quoted booleans → bare booleans
/// 3. strip one trailing comma
/// 4. strip one layer of enclosing quotes around the whole fragment
/// 5. wrap bare key-value bodies in `{ }`
fn normalize(raw: &str) -> String {
    let mut text = raw.trim().to_owned();

    // Blunt token replacement, matching how the source data actually breaks.
    text = text.replace("undefined", "null");
    text = text.replace(r#""true""#, "true").replace(r#""false""#, "false");

    if let Some(stripped) = text.trim_end().strip_suffix(',') {
        text = stripped.trim_end().to_owned();
    }

    if is_fully_quoted(&text) {
        text = text[1..text.len() - 1].to_owned();
    }

    if !(text.starts_with('{') || text.starts_with('[')) {
        text = format!("{{{text}}}");
    }

    text
}

/// True when the first quote's matching close is the final character,
/// i.e. the entire fragment is one quoted string.
fn is_fully_quoted(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'"' {
        return false;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i == bytes.len() - 1,
            _ => i += 1,
        }
    }
    false
}

/// Whole-object mode: repair a multi-key fragment (address object, causes
/// array wrapper) into a JSON object.
pub fn repair_object(raw: &str) -> Result<Map<String, Value>, MalformedFragment> {
    let value: Value = serde_json::from_str(&normalize(raw))
        .map_err(|_| MalformedFragment { fragment: raw.to_owned() })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(MalformedFragment { fragment: raw.to_owned() }),
    }
}

/// Single-entry mode: repair one `"key": value` pair and return it.
pub fn repair_entry(raw: &str) -> Result<(String, Value), MalformedFragment> {
    let map = repair_object(raw)?;
    let mut entries = map.into_iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(MalformedFragment { fragment: raw.to_owned() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_entry_number_with_trailing_comma() {
        let (key, value) = repair_entry(r#""score": 87,"#).unwrap();
        assert_eq!(key, "score");
        assert_eq!(value, json!(87));
    }

    #[test]
    fn whole_object_address_fragment() {
        let raw = r#""addressPhysical":{"street":"1 Main","street2":"","city":"X","state":"NY","zip":"10001"},"#;
        let map = repair_object(raw).unwrap();
        let addr = map.get("addressPhysical").unwrap();
        assert_eq!(addr.get("street").unwrap(), "1 Main");
        assert_eq!(addr.get("zip").unwrap(), "10001");
    }

    #[test]
    fn undefined_sentinel_becomes_null() {
        let (_, value) = repair_entry(r#""phone": undefined,"#).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn quoted_booleans_become_bare() {
        let map = repair_object(r#""active":"true","defunct":"false""#).unwrap();
        assert_eq!(map.get("active").unwrap(), &json!(true));
        assert_eq!(map.get("defunct").unwrap(), &json!(false));
    }

    #[test]
    fn enclosing_quotes_stripped_only_when_whole() {
        // Fully quoted fragment: strip one layer, then wrap.
        let map = repair_object(r#""{}""#);
        assert!(map.unwrap().is_empty());
        // Two adjacent strings are NOT one quoted fragment.
        let (key, value) = repair_entry(r#""phone":"555-0100""#).unwrap();
        assert_eq!(key, "phone");
        assert_eq!(value, json!("555-0100"));
    }

    #[test]
    fn bare_array_passes_through_unwrapped() {
        let err = repair_object(r#"[1, 2, 3]"#).unwrap_err();
        // Valid JSON but not an object: still a malformed fragment for
        // whole-object mode, and the original text is preserved.
        assert!(err.fragment.contains("[1, 2, 3]"));
    }

    #[test]
    fn parse_failure_carries_original_fragment() {
        let err = repair_object(r#""name": {{nope"#).unwrap_err();
        assert_eq!(err.fragment, r#""name": {{nope"#);
    }

    #[test]
    fn multi_entry_fragment_rejected_in_single_mode() {
        assert!(repair_entry(r#""a":1,"b":2"#).is_err());
    }
}
