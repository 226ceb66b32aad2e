//! The cumulative run report and cross-page deduplication.
//!
//! Two records are duplicates iff their parcel ids are equal and non-empty,
//! or — when both parcel ids are empty — their (address, owner) pair
//! matches after case-folding and whitespace collapse. First occurrence
//! wins; later duplicates are counted, not retained.

use crate::error::NavigationError;
use crate::extract::classifier::LayoutKind;
use crate::extract::page::PageResult;
use crate::schema::{FieldName, PropertyRecord};
use crate::session::walker::StopReason;
use fnv::FnvHashSet;
use serde::Serialize;

/// Dedup identity of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Parcel(String),
    AddressOwner(String, String),
}

/// Case-fold and whitespace-collapse, per the dedup contract.
fn fold(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn dedup_key(record: &PropertyRecord) -> DedupKey {
    let parcel = fold(record.text(FieldName::ParcelId));
    if !parcel.is_empty() {
        DedupKey::Parcel(parcel)
    } else {
        DedupKey::AddressOwner(
            fold(record.text(FieldName::PropertyAddress)),
            fold(record.text(FieldName::OwnerName)),
        )
    }
}

/// Per-page line of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub page_index: u32,
    pub layout: LayoutKind,
    pub fragment_count: usize,
    pub mapped_count: usize,
}

/// The terminal artifact of a run: counters plus the deduplicated record
/// sequence in first-seen order. Owned and mutated only by the session.
#[derive(Debug, Default, Serialize)]
pub struct SessionReport {
    pub pages_visited: u32,
    pub fragments_seen: usize,
    pub valid_records: usize,
    /// Fragments dropped for having no fields or no key field.
    pub dropped_records: usize,
    pub duplicate_records: usize,
    pub unparsed_dates: usize,
    pub pages: Vec<PageSummary>,
    /// Errors encountered during the walk, rendered for the caller.
    pub errors: Vec<String>,
    pub stop_reason: Option<StopReason>,
    #[serde(skip)]
    records: Vec<PropertyRecord>,
    #[serde(skip)]
    seen: FnvHashSet<DedupKey>,
}

impl SessionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one extracted page into the aggregate, deduplicating as the
    /// records arrive.
    pub fn absorb(&mut self, page: PageResult) {
        self.pages_visited += 1;
        self.fragments_seen += page.fragment_count;
        self.dropped_records += page.empty_fragments + page.missing_key_fields;
        self.unparsed_dates += page.unparsed_dates;
        self.pages.push(PageSummary {
            page_index: page.page_index,
            layout: page.layout,
            fragment_count: page.fragment_count,
            mapped_count: page.mapped_count,
        });

        for mapped in page.records {
            self.valid_records += 1;
            let key = dedup_key(&mapped.record);
            if self.seen.insert(key) {
                self.records.push(mapped.record);
            } else {
                self.duplicate_records += 1;
            }
        }
    }

    pub fn record_navigation_error(&mut self, error: &NavigationError) {
        self.errors.push(error.to_string());
    }

    /// The final deduplicated records, first-seen order.
    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    /// Consume the report, yielding the record sequence.
    pub fn into_records(self) -> Vec<PropertyRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::field_mapper::MappedRecord;
    use crate::schema::FieldValue;

    fn page_with(records: Vec<PropertyRecord>, page_index: u32) -> PageResult {
        let mapped: Vec<MappedRecord> = records
            .into_iter()
            .map(|record| MappedRecord {
                record,
                unparsed_dates: 0,
            })
            .collect();
        PageResult {
            page_index,
            layout: LayoutKind::Tabular,
            fragment_count: mapped.len(),
            mapped_count: mapped.len(),
            records: mapped,
            empty_fragments: 0,
            missing_key_fields: 0,
            unparsed_dates: 0,
            content_hash: page_index as u64,
        }
    }

    fn record(parcel: &str, address: &str, owner: &str) -> PropertyRecord {
        let mut r = PropertyRecord::new();
        if !parcel.is_empty() {
            r.set(FieldName::ParcelId, FieldValue::Text(parcel.into()));
        }
        if !address.is_empty() {
            r.set(FieldName::PropertyAddress, FieldValue::Text(address.into()));
        }
        if !owner.is_empty() {
            r.set(FieldName::OwnerName, FieldValue::Text(owner.into()));
        }
        r
    }

    #[test]
    fn parcel_duplicates_keep_first_occurrence() {
        let mut report = SessionReport::new();
        report.absorb(page_with(
            vec![record("00-11-22", "123 Main St", "Jane Doe")],
            0,
        ));
        report.absorb(page_with(
            vec![
                record("00-11-22", "123 MAIN ST", "J. Doe"),
                record("00-11-23", "456 Oak Ave", "John Roe"),
            ],
            1,
        ));

        assert_eq!(report.records().len(), 2);
        assert_eq!(report.duplicate_records, 1);
        assert_eq!(report.valid_records, 3);
        // First occurrence survives.
        assert_eq!(
            report.records()[0].text(FieldName::PropertyAddress),
            "123 Main St"
        );
    }

    #[test]
    fn empty_parcels_fall_back_to_address_owner_pair() {
        let mut report = SessionReport::new();
        report.absorb(page_with(
            vec![
                record("", "123 Main St", "Jane Doe"),
                record("", "123  MAIN  st", "JANE DOE"),
                record("", "123 Main St", "Someone Else"),
            ],
            0,
        ));

        assert_eq!(report.records().len(), 2);
        assert_eq!(report.duplicate_records, 1);
    }

    #[test]
    fn distinct_parcels_never_collide() {
        let mut report = SessionReport::new();
        report.absorb(page_with(
            vec![
                record("00-11-22", "123 Main St", "Jane Doe"),
                record("00-11-23", "123 Main St", "Jane Doe"),
            ],
            0,
        ));
        assert_eq!(report.records().len(), 2);
        assert_eq!(report.duplicate_records, 0);
    }

    #[test]
    fn counters_accumulate_across_pages() {
        let mut report = SessionReport::new();
        report.absorb(page_with(vec![record("00-01", "1 A St", "A")], 0));
        report.absorb(page_with(vec![record("00-02", "2 B Ave", "B")], 1));
        assert_eq!(report.pages_visited, 2);
        assert_eq!(report.fragments_seen, 2);
        assert_eq!(report.pages.len(), 2);
    }
}
