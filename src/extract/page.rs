//! Applies the classifier's verdict to pull every raw fragment from one
//! page and map each into a record.
//!
//! Extraction is record-isolated: a malformed fragment reduces the mapped
//! count but never aborts the page. The result carries enough metadata
//! (fragment count vs mapped count, rejection tallies) to diagnose partial
//! loss after the fact.

use crate::error::RejectReason;
use crate::extract::classifier::{self, classify, Layout, LayoutKind};
use crate::extract::field_mapper::{map_fragment, MappedRecord, RawFragment};
use crate::extract::ExtractContext;
use fnv::FnvHasher;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Separators portals use between records in loosely structured text.
const BLOCK_SEPARATORS: &[&str] = &["---", "===", "___", "Property #", "Record #"];

/// Ordered records from one page plus extraction metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub page_index: u32,
    pub layout: LayoutKind,
    #[serde(skip)]
    pub records: Vec<MappedRecord>,
    /// Candidate fragments carved from the page.
    pub fragment_count: usize,
    /// Fragments that mapped to a valid record.
    pub mapped_count: usize,
    pub empty_fragments: usize,
    pub missing_key_fields: usize,
    pub unparsed_dates: usize,
    /// FNV fingerprint of the fragment texts, for the pagination loop guard.
    pub content_hash: u64,
}

impl PageResult {
    fn empty(page_index: u32, layout: LayoutKind) -> Self {
        Self {
            page_index,
            layout,
            records: Vec::new(),
            fragment_count: 0,
            mapped_count: 0,
            empty_fragments: 0,
            missing_key_fields: 0,
            unparsed_dates: 0,
            content_hash: 0,
        }
    }
}

fn sel(source: &str) -> Selector {
    Selector::parse(source).expect("selector is valid")
}

fn link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| sel("a[href]"))
}

/// Extract one page of markup into a [`PageResult`].
pub fn extract_page(markup: &str, page_index: u32, ctx: &ExtractContext<'_>) -> PageResult {
    let doc = Html::parse_document(markup);
    let layout = classify(&doc, ctx);
    let kind = layout.kind();

    let fragments = match layout {
        Layout::Tabular { table } => tabular_fragments(table, ctx),
        Layout::Container { items } => container_fragments(&items, ctx),
        Layout::Text { region } => text_fragments(&region, ctx),
        Layout::NoResults => {
            info!(page = page_index, "no results on page");
            return PageResult::empty(page_index, kind);
        }
    };

    let mut result = PageResult::empty(page_index, kind);
    result.fragment_count = fragments.len();
    result.content_hash = fingerprint(&fragments);

    for fragment in &fragments {
        match map_fragment(fragment, ctx) {
            Ok(mapped) => {
                result.unparsed_dates += mapped.unparsed_dates;
                result.mapped_count += 1;
                result.records.push(mapped);
            }
            Err(RejectReason::EmptyFragment) => {
                result.empty_fragments += 1;
                if ctx.debug {
                    debug!(page = page_index, "fragment rejected: no fields");
                }
            }
            Err(RejectReason::NoKeyFieldFound) => {
                result.missing_key_fields += 1;
                if ctx.debug {
                    debug!(page = page_index, "fragment rejected: no key field");
                }
            }
        }
    }

    info!(
        page = page_index,
        layout = %kind,
        fragments = result.fragment_count,
        mapped = result.mapped_count,
        "page extracted"
    );
    result
}

/// Structural fingerprint over the fragment texts. Two consecutive pages
/// hashing equal means a broken "next" control reloaded the same page.
fn fingerprint(fragments: &[RawFragment]) -> u64 {
    let mut hasher = FnvHasher::default();
    for fragment in fragments {
        hasher.write(fragment.text.as_bytes());
        hasher.write_u8(0);
    }
    hasher.finish()
}

// ─── Tabular strategy ────────────────────────────────────────────────────────

/// One fragment per data row, with header/cell pairs for positional
/// mapping. Header row is the first row (`th` cells or implicit).
fn tabular_fragments(table: ElementRef<'_>, ctx: &ExtractContext<'_>) -> Vec<RawFragment> {
    let rows: Vec<_> = table.select(&sel("tr")).collect();
    let Some((header_row, data_rows)) = rows.split_first() else {
        return Vec::new();
    };

    let headers: Vec<String> = header_row
        .select(&sel("th, td"))
        .map(|cell| classifier::element_text(&cell))
        .collect();

    data_rows
        .iter()
        .filter_map(|row| {
            let cells: Vec<String> = row
                .select(&sel("td"))
                .map(|cell| classifier::element_text(&cell))
                .collect();
            if cells.is_empty() {
                return None;
            }
            let pairs = headers
                .iter()
                .cloned()
                .zip(cells.iter().cloned())
                .collect();
            Some(RawFragment {
                pairs,
                text: cells.join(" "),
                link: first_link(row, ctx),
            })
        })
        .collect()
}

// ─── Container strategy ──────────────────────────────────────────────────────

fn container_fragments(items: &[ElementRef<'_>], ctx: &ExtractContext<'_>) -> Vec<RawFragment> {
    items
        .iter()
        .map(|item| RawFragment {
            pairs: Vec::new(),
            text: classifier::element_text(item),
            link: first_link(item, ctx),
        })
        .collect()
}

fn first_link(el: &ElementRef<'_>, ctx: &ExtractContext<'_>) -> Option<String> {
    el.select(link_selector())
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| ctx.resolve_link(href))
}

// ─── Text strategy ───────────────────────────────────────────────────────────

/// Split a results region into candidate blocks: explicit separators and
/// blank lines first. When that leaves a single run but the region repeats
/// its first field label, each repetition starts a new record. Blocks too
/// short to hold a record are dropped.
fn text_fragments(region: &str, ctx: &ExtractContext<'_>) -> Vec<RawFragment> {
    let mut blocks: Vec<String> = vec![region.to_string()];
    for separator in BLOCK_SEPARATORS {
        blocks = blocks
            .iter()
            .flat_map(|b| b.split(separator))
            .map(str::to_string)
            .collect();
    }
    blocks = blocks
        .iter()
        .flat_map(|b| b.split("\n\n"))
        .map(str::to_string)
        .collect();
    blocks.retain(|b| !b.trim().is_empty());

    if blocks.len() == 1 {
        blocks = split_on_repeated_label(&blocks[0], ctx);
    }

    blocks
        .into_iter()
        .map(|b| b.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|b| b.len() > 20)
        .map(|text| RawFragment {
            pairs: Vec::new(),
            text,
            link: None,
        })
        .collect()
}

/// Every occurrence of the earliest field label opens a new block:
/// "Address: ... Owner: ... Address: ..." is two records.
fn split_on_repeated_label(block: &str, ctx: &ExtractContext<'_>) -> Vec<String> {
    let matches = ctx.matcher.scan(block);
    let Some(first) = matches.first() else {
        return vec![block.to_string()];
    };
    let starts: Vec<usize> = matches
        .iter()
        .filter(|m| m.field == first.field)
        .map(|m| m.start)
        .collect();
    if starts.len() < 2 {
        return vec![block.to_string()];
    }

    let mut blocks = Vec::with_capacity(starts.len());
    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(block.len());
        blocks.push(block[*start..end].to_string());
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::labels::{LabelMatcher, MatchMode};
    use crate::schema::{FieldName, FieldValue};

    fn matcher() -> LabelMatcher {
        LabelMatcher::new(MatchMode::Fuzzy)
    }

    const TABULAR_PAGE: &str = r#"
    <html><body><table>
        <tr><th>Address</th><th>Owner</th><th>Value</th><th>Parcel</th></tr>
        <tr>
            <td><a href="/record/1">123 Main St</a></td>
            <td>Jane Doe</td><td>$450,000</td><td>00-11-22</td>
        </tr>
        <tr>
            <td>456 Oak Ave</td><td>John Roe</td><td>$N/A</td><td>00-11-23</td>
        </tr>
    </table></body></html>
    "#;

    #[test]
    fn tabular_page_maps_each_row() {
        let m = matcher();
        let ctx = ExtractContext::new(&m);
        let result = extract_page(TABULAR_PAGE, 0, &ctx);
        assert_eq!(result.layout, LayoutKind::Tabular);
        assert_eq!(result.fragment_count, 2);
        assert_eq!(result.mapped_count, 2);

        let first = &result.records[0].record;
        assert_eq!(first.text(FieldName::PropertyAddress), "123 Main St");
        assert_eq!(*first.get(FieldName::PropertyValue), FieldValue::Money(450000.0));
        assert_eq!(first.text(FieldName::RecordUrl), "/record/1");

        // "N/A" value normalizes to null but the record stays valid: the
        // parcel id is present.
        let second = &result.records[1].record;
        assert!(second.get(FieldName::PropertyValue).is_null());
        assert_eq!(second.text(FieldName::ParcelId), "00-11-23");
    }

    #[test]
    fn malformed_rows_reduce_mapped_count_not_page() {
        let html = r#"
        <html><body><table>
            <tr><th>Address</th><th>Owner</th></tr>
            <tr><td>123 Main St</td><td>Jane Doe</td></tr>
            <tr><td></td><td></td></tr>
            <tr><td>789 Pine Rd</td><td>Ann Poe</td></tr>
        </table></body></html>
        "#;
        let m = matcher();
        let ctx = ExtractContext::new(&m);
        let result = extract_page(html, 0, &ctx);
        assert_eq!(result.fragment_count, 3);
        assert_eq!(result.mapped_count, 2);
        assert_eq!(result.empty_fragments, 1);
    }

    #[test]
    fn no_results_page_is_empty_not_an_error() {
        let html = r#"<html><body><p>No results found for this search.</p></body></html>"#;
        let m = matcher();
        let ctx = ExtractContext::new(&m);
        let result = extract_page(html, 3, &ctx);
        assert_eq!(result.layout, LayoutKind::NoResults);
        assert_eq!(result.fragment_count, 0);
        assert!(result.records.is_empty());
    }

    #[test]
    fn container_page_maps_each_card() {
        let html = r#"
        <html><body>
            <div class="result-item">
                Address: 123 Main St Owner: Jane Doe
                <a href="https://portal.example.gov/r/1">details</a>
            </div>
            <div class="result-item">Address: 456 Oak Ave Owner: John Roe</div>
        </body></html>
        "#;
        let m = matcher();
        let ctx = ExtractContext::new(&m);
        let result = extract_page(html, 0, &ctx);
        assert_eq!(result.layout, LayoutKind::Container);
        assert_eq!(result.mapped_count, 2);
        assert_eq!(
            result.records[0].record.text(FieldName::RecordUrl),
            "https://portal.example.gov/r/1"
        );
    }

    #[test]
    fn text_page_splits_on_separators() {
        let html = r#"
        <html><body><pre>
Property # 1
Address: 123 Main St
Owner: Jane Doe
Property # 2
Address: 456 Oak Ave
Owner: John Roe
        </pre></body></html>
        "#;
        let m = matcher();
        let ctx = ExtractContext::new(&m);
        let result = extract_page(html, 0, &ctx);
        assert_eq!(result.layout, LayoutKind::Text);
        assert_eq!(result.mapped_count, 2);
        assert_eq!(
            result.records[1].record.text(FieldName::PropertyAddress),
            "456 Oak Ave"
        );
    }

    #[test]
    fn text_page_without_separators_splits_on_repeated_labels() {
        let html = "<html><body><p>Address: 123 Main St Owner: Jane Doe \
                    Address: 456 Oak Ave Owner: John Roe</p></body></html>";
        let m = matcher();
        let ctx = ExtractContext::new(&m);
        let result = extract_page(html, 0, &ctx);
        assert_eq!(result.layout, LayoutKind::Text);
        assert_eq!(result.mapped_count, 2);
        assert_eq!(
            result.records[0].record.text(FieldName::PropertyAddress),
            "123 Main St"
        );
        assert_eq!(
            result.records[1].record.text(FieldName::PropertyAddress),
            "456 Oak Ave"
        );
    }

    #[test]
    fn identical_pages_share_a_fingerprint() {
        let m = matcher();
        let ctx = ExtractContext::new(&m);
        let a = extract_page(TABULAR_PAGE, 0, &ctx);
        let b = extract_page(TABULAR_PAGE, 1, &ctx);
        assert_eq!(a.content_hash, b.content_hash);

        let other = extract_page(
            r#"<html><body><table>
            <tr><th>Address</th></tr>
            <tr><td>1 A St</td></tr><tr><td>2 B Ave</td></tr>
            </table></body></html>"#,
            2,
            &ctx,
        );
        assert_ne!(a.content_hash, other.content_hash);
    }
}
