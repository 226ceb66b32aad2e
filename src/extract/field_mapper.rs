//! Maps one raw fragment into a canonical property record.
//!
//! A fragment is either a table row (labeled header/cell pairs plus its
//! flattened text) or an unlabeled container/text block. Header pairs are
//! mapped positionally; everything else falls to an inline scan: earliest
//! occurrence of each field's candidate label, value text up to the next
//! recognized label or a fixed span boundary. Bare regex fallbacks recover
//! addresses, parcel ids and sale dates that nothing announced with a
//! label. The mapper is pure — mapping the same fragment twice yields the
//! same record.

use crate::error::RejectReason;
use crate::extract::ExtractContext;
use crate::schema::normalize;
use crate::schema::{spec_for, FieldName, FieldValue, PropertyRecord};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Longest value span taken after an inline label when no further label
/// bounds it.
const VALUE_SPAN_LIMIT: usize = 80;

/// One unit of markup representing a single candidate record. Created per
/// page by the extractor, consumed immediately here, never persisted.
#[derive(Debug, Clone, Default)]
pub struct RawFragment {
    /// Header/cell pairs when the fragment came from a table row.
    pub pairs: Vec<(String, String)>,
    /// Flattened visible text of the fragment.
    pub text: String,
    /// First hyperlink found inside the fragment, already resolved.
    pub link: Option<String>,
}

/// A successfully mapped record plus its side annotations.
#[derive(Debug, Clone)]
pub struct MappedRecord {
    pub record: PropertyRecord,
    /// Dates that stayed raw because no format matched. Surfaced in page
    /// counters, not in the record itself.
    pub unparsed_dates: usize,
}

/// Map a fragment against the full field spec set.
pub fn map_fragment(
    fragment: &RawFragment,
    ctx: &ExtractContext<'_>,
) -> Result<MappedRecord, RejectReason> {
    let mut record = PropertyRecord::new();
    let mut recognized = 0usize;
    let mut unparsed_dates = 0usize;

    // Positional pairs first: a header told us exactly what each cell is.
    for (header, cell) in &fragment.pairs {
        let Some(field) = ctx.matcher.match_label(header) else {
            continue;
        };
        if !record.get(field).is_null() {
            continue;
        }
        let normalized = normalize::apply(spec_for(field).kind, cell);
        if normalized.unparsed_date {
            unparsed_dates += 1;
        }
        // Blank cells leave the field null and do not count as recognized;
        // explicit "N/A" cells do count — the column was present.
        if cell.trim().is_empty() {
            continue;
        }
        if ctx.debug {
            debug!(field = %field, raw = %cell, "mapper: header pair");
        }
        record.set(field, normalized.value);
        recognized += 1;
    }

    // Inline scan for whatever the pairs did not cover.
    for (field, raw_value) in inline_values(&fragment.text, ctx) {
        if !record.get(field).is_null() {
            continue;
        }
        let normalized = normalize::apply(spec_for(field).kind, &raw_value);
        if normalized.unparsed_date {
            unparsed_dates += 1;
        }
        if ctx.debug {
            debug!(field = %field, raw = %raw_value, "mapper: inline label");
        }
        record.set(field, normalized.value);
        recognized += 1;
    }

    if recognized == 0 {
        return Err(RejectReason::EmptyFragment);
    }

    // Unlabeled fallbacks for the fields the original portals most often
    // print bare: an address line, a parcel number, a sale date.
    apply_bare_fallbacks(&mut record, &fragment.text);

    if !record.has_key_field() {
        return Err(RejectReason::NoKeyFieldFound);
    }

    if record.get(FieldName::RecordUrl).is_null() {
        if let Some(link) = &fragment.link {
            record.set(FieldName::RecordUrl, FieldValue::Url(link.clone()));
        }
    }

    Ok(MappedRecord {
        record,
        unparsed_dates,
    })
}

/// Earliest-label inline extraction: `(field, raw value)` pairs in label
/// position order. Later occurrences of an already-seen field are dropped.
fn inline_values(text: &str, ctx: &ExtractContext<'_>) -> Vec<(FieldName, String)> {
    let matches = ctx.matcher.scan(text);
    let mut out: Vec<(FieldName, String)> = Vec::with_capacity(matches.len());

    for (i, m) in matches.iter().enumerate() {
        if out.iter().any(|(f, _)| *f == m.field) {
            continue;
        }
        let start = m.end;
        let hard_end = matches
            .get(i + 1)
            .map(|next| next.start)
            .unwrap_or(text.len());
        let end = clamp_to_char_boundary(text, hard_end.min(start + VALUE_SPAN_LIMIT));
        if end <= start {
            continue;
        }
        let raw = text[start..end].trim();
        let raw = raw.trim_start_matches(|c: char| matches!(c, ':' | '#' | '-' | '.') || c.is_whitespace());
        out.push((m.field, raw.to_string()));
    }
    out
}

fn clamp_to_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// ─── Bare-pattern fallbacks ──────────────────────────────────────────────────

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b\d+\s+[A-Z][A-Za-z ]+?\s(?:ST|AVE|RD|DR|LN|CT|PL|WAY|BLVD|CIR|STREET|AVENUE|ROAD|DRIVE|LANE|COURT|PLACE|BOULEVARD|CIRCLE)\b",
        )
        .expect("address regex is valid")
    })
}

fn parcel_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Dashed parcel formats first, then long bare numeric ids.
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{2}-\d{2,4}-\d{2,4}(?:-\d{2,4})*|\d{10,15})\b")
            .expect("parcel regex is valid")
    })
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2})\b").expect("date regex is valid")
    })
}

/// Recover key fields that appear without any label. Only fills fields
/// still null, so labeled values always win.
fn apply_bare_fallbacks(record: &mut PropertyRecord, text: &str) {
    if record.get(FieldName::PropertyAddress).is_null() {
        if let Some(hit) = address_regex().find(text) {
            record.set(
                FieldName::PropertyAddress,
                FieldValue::Text(normalize::clean(hit.as_str())),
            );
        }
    }
    if record.get(FieldName::ParcelId).is_null() {
        if let Some(hit) = parcel_regex().find(text) {
            record.set(
                FieldName::ParcelId,
                FieldValue::Text(hit.as_str().to_string()),
            );
        }
    }
    if record.get(FieldName::SaleDate).is_null() {
        if let Some(hit) = date_regex().find(text) {
            let normalized = normalize::apply(spec_for(FieldName::SaleDate).kind, hit.as_str());
            record.set(FieldName::SaleDate, normalized.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::labels::{LabelMatcher, MatchMode};
    use crate::schema::AreaUnit;
    use chrono::NaiveDate;

    fn fuzzy_matcher() -> LabelMatcher {
        LabelMatcher::new(MatchMode::Fuzzy)
    }

    fn text_fragment(text: &str) -> RawFragment {
        RawFragment {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn header_pairs_map_positionally() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment = RawFragment {
            pairs: vec![
                ("Property Address".into(), "123 Main St".into()),
                ("Owner Name".into(), "Jane Doe".into()),
                ("Just Value".into(), "$450,000".into()),
                ("PCN".into(), "00-11-22".into()),
            ],
            text: "123 Main St Jane Doe $450,000 00-11-22".into(),
            link: None,
        };
        let mapped = map_fragment(&fragment, &ctx).unwrap();
        assert_eq!(
            mapped.record.text(FieldName::PropertyAddress),
            "123 Main St"
        );
        assert_eq!(mapped.record.text(FieldName::OwnerName), "Jane Doe");
        assert_eq!(
            *mapped.record.get(FieldName::PropertyValue),
            FieldValue::Money(450000.0)
        );
        assert_eq!(mapped.record.text(FieldName::ParcelId), "00-11-22");
    }

    #[test]
    fn inline_labels_bound_each_other() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment =
            text_fragment("Owner: JANE DOE Address: 123 Main St Parcel: 00-11-22 Bldg SqFt: 1,850");
        let mapped = map_fragment(&fragment, &ctx).unwrap();
        assert_eq!(mapped.record.text(FieldName::OwnerName), "JANE DOE");
        assert_eq!(
            mapped.record.text(FieldName::PropertyAddress),
            "123 Main St"
        );
        assert_eq!(mapped.record.text(FieldName::ParcelId), "00-11-22");
        assert_eq!(
            *mapped.record.get(FieldName::SquareFootage),
            FieldValue::Area {
                value: 1850.0,
                unit: AreaUnit::SquareFeet
            }
        );
    }

    #[test]
    fn earliest_label_occurrence_wins() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment = text_fragment("Owner: FIRST HOLDER Parcel: 00-11-22 Owner: SECOND HOLDER");
        let mapped = map_fragment(&fragment, &ctx).unwrap();
        assert_eq!(mapped.record.text(FieldName::OwnerName), "FIRST HOLDER");
    }

    #[test]
    fn mapping_is_idempotent() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment = text_fragment("Address: 123 Main St Owner: Jane Doe Sale Date: 01/15/2020");
        let first = map_fragment(&fragment, &ctx).unwrap();
        let second = map_fragment(&fragment, &ctx).unwrap();
        assert_eq!(first.record, second.record);
    }

    #[test]
    fn unlabeled_fragment_is_rejected_empty() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment = text_fragment("lorem ipsum dolor sit amet");
        assert_eq!(
            map_fragment(&fragment, &ctx).unwrap_err(),
            RejectReason::EmptyFragment
        );
    }

    #[test]
    fn missing_key_fields_are_rejected() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment = text_fragment("Bedrooms: 3 Bathrooms: 2.5");
        assert_eq!(
            map_fragment(&fragment, &ctx).unwrap_err(),
            RejectReason::NoKeyFieldFound
        );
    }

    #[test]
    fn bare_patterns_recover_unlabeled_key_fields() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        // "Taxes" is the only labeled field; address and parcel appear bare.
        let fragment = text_fragment("456 Oak Ave sold 03/02/2019 Taxes: $3,100 00-11-23");
        let mapped = map_fragment(&fragment, &ctx).unwrap();
        assert_eq!(mapped.record.text(FieldName::PropertyAddress), "456 Oak Ave");
        assert_eq!(
            *mapped.record.get(FieldName::TaxAmount),
            FieldValue::Money(3100.0)
        );
        assert_eq!(
            *mapped.record.get(FieldName::SaleDate),
            FieldValue::Date(NaiveDate::from_ymd_opt(2019, 3, 2).unwrap())
        );
    }

    #[test]
    fn fragment_link_fills_record_url() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment = RawFragment {
            pairs: vec![("Address".into(), "123 Main St".into())],
            text: "123 Main St".into(),
            link: Some("https://portal.example.gov/record/1".into()),
        };
        let mapped = map_fragment(&fragment, &ctx).unwrap();
        assert_eq!(
            mapped.record.text(FieldName::RecordUrl),
            "https://portal.example.gov/record/1"
        );
    }

    #[test]
    fn unparsed_dates_are_annotated_not_lost() {
        let matcher = fuzzy_matcher();
        let ctx = ExtractContext::new(&matcher);
        let fragment = text_fragment("Address: 123 Main St Sale Date: early spring 2020");
        let mapped = map_fragment(&fragment, &ctx).unwrap();
        assert_eq!(mapped.unparsed_dates, 1);
        assert_eq!(
            mapped.record.text(FieldName::SaleDate),
            "early spring 2020"
        );
    }
}
