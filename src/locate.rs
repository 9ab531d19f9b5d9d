// src/locate.rs
// Structured-data locator: pull per-field candidate fragments out of a page.
//
// Two embedding patterns exist side by side:
//  * one canonical <script type="application/ld+json"> block with fully valid
//    JSON (name, url, nonprofitStatus, aggregateRating),
//  * free-form script blocks carrying partial, escaped fragments that need
//    the repairer before they parse.
//
// A free-form block only counts as data-bearing when it contains both the
// organization-details marker and the causes marker; everything else on the
// page (analytics, framework bootstrap) fails that test.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

// Markers that qualify a script block as a free-form data source.
pub const ORG_DETAILS_MARKER: &str = r#""organization""#;
pub const CAUSES_MARKER: &str = r#""causes""#;

// Score extraction is only trusted inside blocks that also carry these.
pub const RATING_DETAILS_MARKER: &str = r#""ratingDetails""#;
pub const SCORE_MARKER: &str = r#""score""#;

/// The fixed field set the pipeline extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Website,
    NonprofitStatus,
    Review,
    Address,
    Phone,
    Mission,
    Causes,
    Rating,
}

/// Where a candidate came from. Canonical wins during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Canonical,
    FreeForm,
}

/// A text slice believed to hold one field's serialized value.
///
/// For canonical candidates `raw` is a valid JSON value. For free-form
/// scalar strings (name, website) it is the captured plain text; for the
/// repairable fields (address, phone, mission, causes, rating) it is the
/// whole `"key": value` fragment, fed to the repairer downstream.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub field: Field,
    pub origin: Origin,
    pub raw: String,
}

/// First candidate for a field from a given origin, in discovery order.
pub fn pick<'a>(found: &'a [Candidate], field: Field, origin: Origin) -> Option<&'a str> {
    found
        .iter()
        .find(|c| c.field == field && c.origin == origin)
        .map(|c| c.raw.as_str())
}

// Fields sourced from free-form blocks; scanning stops once each has a hit.
const FREE_FIELDS: [Field; 7] = [
    Field::Name,
    Field::Website,
    Field::Address,
    Field::Phone,
    Field::Mission,
    Field::Causes,
    Field::Rating,
];

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("static selector is valid"));

// Each pattern bounds its match non-greedily at the nearest closing delimiter
// for its key, so it cannot overrun into the neighboring key-value pair.
static RE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""name"\s*:\s*"([^"]*)""#).expect("static regex"));
static RE_WEBSITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""websiteURL"\s*:\s*"([^"]*)""#).expect("static regex"));
static RE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""addressPhysical"\s*:\s*\{[^}]*\}"#).expect("static regex"));
static RE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""phone"\s*:\s*(?:"[^"]*"|undefined|null)"#).expect("static regex"));
static RE_MISSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""mission"\s*:\s*(?:"[^"]*"|undefined|null)"#).expect("static regex"));
static RE_CAUSES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"causes"\s*:\s*\[.*?\]"#).expect("static regex"));
static RE_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""score"\s*:\s*(?:"[0-9][0-9.]*"|[0-9][0-9.]*)"#).expect("static regex"));

/// Scan a fetched page and return every candidate fragment found.
pub fn locate(html: &str) -> Vec<Candidate> {
    let doc = Html::parse_document(html);
    let mut found = Vec::new();
    canonical_candidates(&doc, &mut found);
    freeform_candidates(&doc, &mut found);
    found
}

fn canonical_candidates(doc: &Html, out: &mut Vec<Candidate>) {
    let Some(el) = doc
        .select(&SCRIPT)
        .find(|el| el.value().attr("type") == Some("application/ld+json"))
    else {
        return;
    };
    let text: String = el.text().collect();

    // Non-fatal: a broken canonical block degrades to "no canonical
    // candidates", it never aborts the page.
    let parsed: Value = match serde_json::from_str(text.trim()) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "canonical structured-data block failed to parse, skipping it");
            return;
        }
    };

    push_canonical(out, Field::Name, parsed.get("name"));
    push_canonical(out, Field::Website, parsed.get("url"));
    push_canonical(out, Field::NonprofitStatus, parsed.get("nonprofitStatus"));
    push_canonical(
        out,
        Field::Review,
        parsed.get("aggregateRating").and_then(|r| r.get("ratingValue")),
    );
}

fn push_canonical(out: &mut Vec<Candidate>, field: Field, value: Option<&Value>) {
    if let Some(value) = value {
        if !value.is_null() {
            out.push(Candidate { field, origin: Origin::Canonical, raw: value.to_string() });
        }
    }
}

fn freeform_candidates(doc: &Html, out: &mut Vec<Candidate>) {
    for el in doc.select(&SCRIPT) {
        if el.value().attr("type") == Some("application/ld+json") {
            continue;
        }
        let text: String = el.text().collect();
        if !(text.contains(ORG_DETAILS_MARKER) && text.contains(CAUSES_MARKER)) {
            continue;
        }

        // The payload arrives string-escaped inside the script source.
        let text = text.replace('\\', "");

        // Org details precede the causes array in the payload, so the first
        // "name" hit is the organization, not a cause item.
        take_first(out, Field::Name, &RE_NAME, &text, true);
        take_first(out, Field::Website, &RE_WEBSITE, &text, true);
        take_first(out, Field::Address, &RE_ADDRESS, &text, false);
        take_first(out, Field::Phone, &RE_PHONE, &text, false);
        take_first(out, Field::Mission, &RE_MISSION, &text, false);
        take_first(out, Field::Causes, &RE_CAUSES, &text, false);

        if text.contains(RATING_DETAILS_MARKER) && text.contains(SCORE_MARKER) {
            take_first(out, Field::Rating, &RE_SCORE, &text, false);
        }

        // Early exit is a shortcut, not a contract: missing fields keep
        // accumulating from later blocks until every one has a candidate.
        if FREE_FIELDS.iter().all(|f| pick(out, *f, Origin::FreeForm).is_some()) {
            debug!("all free-form fields satisfied, stopping the block scan");
            break;
        }
    }
}

/// Record the first non-empty match for `field`, keeping an earlier block's
/// hit if one exists. `group` selects capture group 1 over the whole match.
fn take_first(out: &mut Vec<Candidate>, field: Field, re: &Regex, text: &str, group: bool) {
    if pick(out, field, Origin::FreeForm).is_some() {
        return;
    }
    let Some(caps) = re.captures(text) else { return };
    let m = if group { caps.get(1) } else { caps.get(0) };
    if let Some(m) = m {
        if !m.as_str().is_empty() {
            out.push(Candidate {
                field,
                origin: Origin::FreeForm,
                raw: m.as_str().to_owned(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(canonical: &str, scripts: &[&str]) -> String {
        let mut html = s!("<html><head>");
        if !canonical.is_empty() {
            html.push_str(&format!(
                r#"<script type="application/ld+json">{canonical}</script>"#
            ));
        }
        for s in scripts {
            html.push_str(&format!("<script>{s}</script>"));
        }
        html.push_str("</head><body></body></html>");
        html
    }

    const CANONICAL: &str = r#"{
        "@type": "NGO",
        "name": "Helping Hands",
        "url": "https://helpinghands.example.org",
        "nonprofitStatus": "501(c)(3)",
        "aggregateRating": { "ratingValue": 4.5 }
    }"#;

    const FREEFORM: &str = r#"window.__DATA__ = {"organization":{"name":"Helping Hands Inc","websiteURL":"https://hh.example.org","mission":"Feed everyone.","phone":"555-0100","addressPhysical":{"street":"1 Main","street2":"","city":"X","state":"NY","zip":"10001"}},"causes":[{"name":"Hunger"},{"name":"Housing"}]};"#;

    const RATED: &str = r#"var x = {"organization":{"name":"Helping Hands Inc"},"causes":[],"ratingDetails":{"score":87}};"#;

    #[test]
    fn canonical_block_yields_canonical_candidates() {
        let found = locate(&page(CANONICAL, &[]));
        assert_eq!(pick(&found, Field::Name, Origin::Canonical), Some(r#""Helping Hands""#));
        assert_eq!(
            pick(&found, Field::Website, Origin::Canonical),
            Some(r#""https://helpinghands.example.org""#)
        );
        assert_eq!(pick(&found, Field::Review, Origin::Canonical), Some("4.5"));
        assert!(pick(&found, Field::Name, Origin::FreeForm).is_none());
    }

    #[test]
    fn broken_canonical_degrades_to_no_candidates() {
        let found = locate(&page("{not json", &[FREEFORM]));
        assert!(pick(&found, Field::Name, Origin::Canonical).is_none());
        // Free-form extraction still ran.
        assert_eq!(pick(&found, Field::Name, Origin::FreeForm), Some("Helping Hands Inc"));
    }

    #[test]
    fn freeform_block_yields_field_fragments() {
        let found = locate(&page("", &[FREEFORM]));
        assert_eq!(pick(&found, Field::Website, Origin::FreeForm), Some("https://hh.example.org"));
        let addr = pick(&found, Field::Address, Origin::FreeForm).unwrap();
        assert!(addr.starts_with(r#""addressPhysical""#));
        assert!(addr.ends_with('}'));
        let causes = pick(&found, Field::Causes, Origin::FreeForm).unwrap();
        assert!(causes.contains("Hunger"));
        assert!(causes.ends_with(']'));
        // No rating markers in this block.
        assert!(pick(&found, Field::Rating, Origin::FreeForm).is_none());
    }

    #[test]
    fn unmarked_blocks_are_ignored() {
        let noise = r#"ga('send', {"name":"pageview"});"#;
        let found = locate(&page("", &[noise]));
        assert!(found.is_empty());
    }

    #[test]
    fn score_requires_rating_markers() {
        let found = locate(&page("", &[RATED]));
        assert_eq!(pick(&found, Field::Rating, Origin::FreeForm), Some(r#""score":87"#));
    }

    #[test]
    fn later_blocks_fill_missing_fields() {
        // First qualifying block has no phone; a later one does.
        let partial = r#"{"organization":{"name":"A"},"causes":[{"name":"C"}]}"#;
        let found = locate(&page("", &[partial, FREEFORM]));
        assert_eq!(pick(&found, Field::Name, Origin::FreeForm), Some("A"));
        assert_eq!(pick(&found, Field::Phone, Origin::FreeForm), Some(r#""phone":"555-0100""#));
    }

    #[test]
    fn escaped_payload_is_unescaped_before_matching() {
        let escaped = r#"{"organization":{\"name\":\"Esc Org\"},"causes":[]}"#;
        let found = locate(&page("", &[escaped]));
        assert_eq!(pick(&found, Field::Name, Origin::FreeForm), Some("Esc Org"));
    }
}
