// src/reconcile.rs
// Merge canonical and free-form candidates into one normalized record.
//
// Precedence is per field: canonical wins where a canonical source exists,
// free-form fills the rest. Every missing optional field resolves to null;
// only a missing name makes the record invalid.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::locate::{pick, Candidate, Field, Origin};
use crate::repair::{repair_entry, repair_object};

/// One extracted organization, keyed by EIN. Field set matches the store
/// schema column for column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrgRecord {
    pub ein: String,
    pub name: Option<String>,
    pub website: Option<String>,
    pub nonprofit_status: Option<String>,
    pub review: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub mission: Option<String>,
    pub categories: Option<String>,
    pub rating: Option<f64>,
}

impl OrgRecord {
    /// A record without a name signals failed extraction and must not be
    /// persisted.
    pub fn is_valid(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

pub fn reconcile(ein: &str, found: &[Candidate]) -> OrgRecord {
    OrgRecord {
        ein: ein.to_owned(),
        name: canonical_string(found, Field::Name)
            .or_else(|| freeform_text(found, Field::Name)),
        // Canonical if non-empty, else free-form, else null.
        website: canonical_string(found, Field::Website)
            .filter(|s| !s.is_empty())
            .or_else(|| freeform_text(found, Field::Website)),
        nonprofit_status: canonical_string(found, Field::NonprofitStatus),
        review: canonical_number(found, Field::Review),
        address: pick(found, Field::Address, Origin::FreeForm).and_then(format_address),
        phone: entry_string(found, Field::Phone),
        mission: entry_string(found, Field::Mission),
        categories: pick(found, Field::Causes, Origin::FreeForm).and_then(join_causes),
        rating: entry_number(found, Field::Rating),
    }
}

/* ---------------- per-field decoding ---------------- */

fn canonical_string(found: &[Candidate], field: Field) -> Option<String> {
    let raw = pick(found, field, Origin::Canonical)?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => Some(s),
        Ok(Value::Null) => None,
        Ok(other) => Some(other.to_string()),
        Err(e) => {
            warn!(?field, error = %e, "canonical candidate failed to decode");
            None
        }
    }
}

fn canonical_number(found: &[Candidate], field: Field) -> Option<f64> {
    let raw = pick(found, field, Origin::Canonical)?;
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => number_of(&value),
        Err(e) => {
            warn!(?field, error = %e, "canonical candidate failed to decode");
            None
        }
    }
}

/// Plain captured text (free-form name and website).
fn freeform_text(found: &[Candidate], field: Field) -> Option<String> {
    pick(found, field, Origin::FreeForm).map(str::to_owned)
}

/// Decode a `"key": value` fragment through the repairer's single-entry mode.
fn entry_value(found: &[Candidate], field: Field) -> Option<Value> {
    let raw = pick(found, field, Origin::FreeForm)?;
    match repair_entry(raw) {
        Ok((_, value)) => Some(value),
        Err(e) => {
            warn!(?field, %e, "dropping unrepairable fragment");
            None
        }
    }
}

fn entry_string(found: &[Candidate], field: Field) -> Option<String> {
    match entry_value(found, field)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn entry_number(found: &[Candidate], field: Field) -> Option<f64> {
    entry_value(found, field).as_ref().and_then(number_of)
}

/// Numbers may arrive bare or string-quoted; accept both.
fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `{street} {street2}, {city} {state} {zip}` from the four address
/// subfields. Missing subfields render as empty, not as errors.
fn format_address(fragment: &str) -> Option<String> {
    let map = match repair_object(fragment) {
        Ok(map) => map,
        Err(e) => {
            warn!(%e, "dropping unrepairable address fragment");
            return None;
        }
    };
    let obj = map.get("addressPhysical").and_then(Value::as_object)?;
    let part = |key: &str| -> &str { obj.get(key).and_then(Value::as_str).unwrap_or("") };
    Some(format!(
        "{} {}, {} {} {}",
        part("street"),
        part("street2"),
        part("city"),
        part("state"),
        part("zip"),
    ))
}

/// Comma-joined `name` subfields of the causes array items.
fn join_causes(fragment: &str) -> Option<String> {
    let map = match repair_object(fragment) {
        Ok(map) => map,
        Err(e) => {
            warn!(%e, "dropping unrepairable causes fragment");
            return None;
        }
    };
    let items = map.get("causes").and_then(Value::as_array)?;
    let names: Vec<&str> = items
        .iter()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(field: Field, origin: Origin, raw: &str) -> Candidate {
        Candidate { field, origin, raw: s!(raw) }
    }

    #[test]
    fn address_fragment_formats_with_empty_street2() {
        let raw = r#""addressPhysical":{"street":"1 Main","street2":"","city":"X","state":"NY","zip":"10001"},"#;
        assert_eq!(format_address(raw).as_deref(), Some("1 Main , X NY 10001"));
    }

    #[test]
    fn canonical_name_alone_is_persistable() {
        let found = vec![cand(Field::Name, Origin::Canonical, r#""Helping Hands""#)];
        let rec = reconcile("042662631", &found);
        assert!(rec.is_valid());
        assert_eq!(rec.name.as_deref(), Some("Helping Hands"));
        assert_eq!(rec.website, None);
        assert_eq!(rec.address, None);
        assert_eq!(rec.phone, None);
        assert_eq!(rec.mission, None);
        assert_eq!(rec.categories, None);
        assert_eq!(rec.rating, None);
    }

    #[test]
    fn no_candidates_yields_invalid_record() {
        let rec = reconcile("000000000", &[]);
        assert_eq!(rec.name, None);
        assert!(!rec.is_valid());
    }

    #[test]
    fn website_falls_back_when_canonical_empty() {
        let found = vec![
            cand(Field::Name, Origin::Canonical, r#""Org""#),
            cand(Field::Website, Origin::Canonical, r#""""#),
            cand(Field::Website, Origin::FreeForm, "https://fallback.example.org"),
        ];
        let rec = reconcile("1", &found);
        assert_eq!(rec.website.as_deref(), Some("https://fallback.example.org"));
    }

    #[test]
    fn freeform_name_used_when_canonical_absent() {
        let found = vec![cand(Field::Name, Origin::FreeForm, "Free Org")];
        let rec = reconcile("2", &found);
        assert_eq!(rec.name.as_deref(), Some("Free Org"));
        assert!(rec.is_valid());
    }

    #[test]
    fn malformed_optional_fields_resolve_to_null() {
        let found = vec![
            cand(Field::Name, Origin::Canonical, r#""Org""#),
            cand(Field::Phone, Origin::FreeForm, r#""phone": {{broken"#),
            cand(Field::Review, Origin::Canonical, "not-json"),
        ];
        let rec = reconcile("3", &found);
        assert!(rec.is_valid());
        assert_eq!(rec.phone, None);
        assert_eq!(rec.review, None);
    }

    #[test]
    fn causes_join_and_rating_decode() {
        let found = vec![
            cand(Field::Name, Origin::FreeForm, "Org"),
            cand(Field::Causes, Origin::FreeForm, r#""causes":[{"name":"Hunger"},{"name":"Housing"}]"#),
            cand(Field::Rating, Origin::FreeForm, r#""score": 87"#),
        ];
        let rec = reconcile("4", &found);
        assert_eq!(rec.categories.as_deref(), Some("Hunger, Housing"));
        assert_eq!(rec.rating, Some(87.0));
    }

    #[test]
    fn undefined_phone_resolves_to_null() {
        let found = vec![
            cand(Field::Name, Origin::FreeForm, "Org"),
            cand(Field::Phone, Origin::FreeForm, r#""phone": undefined"#),
        ];
        assert_eq!(reconcile("5", &found).phone, None);
    }
}
