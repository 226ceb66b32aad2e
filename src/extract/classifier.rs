//! Layout classification for an unknown results page.
//!
//! Decision order, first match wins: tabular, then repeated containers,
//! then free text with recognizable field labels, then no-results. The
//! order is deliberate — tabular and container layouts carry positional
//! structure that makes field mapping far more reliable than text scanning,
//! so they are preferred even when a text-pattern match would also hold.
//! Pages that match nothing confidently degrade to `NoResults` with a
//! warning, never an error.

use crate::extract::ExtractContext;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Minimum sibling count for the container layout.
const MIN_CONTAINERS: usize = 2;

/// Minimum distinct field labels for the text layout.
const MIN_TEXT_LABELS: usize = 2;

/// Explicit empty-result marker phrases portals print instead of records.
const NO_RESULTS_MARKERS: &[&str] = &[
    "no results",
    "no records",
    "no matches",
    "0 results",
    "returned no",
];

/// Container class hints checked before the generic sibling scan.
const CONTAINER_CLASS_HINTS: &[&str] = &[
    "div[class*='property']",
    "div[class*='result']",
    "div[class*='listing']",
    "div[class*='card']",
    "li[class*='result']",
];

/// The classifier's verdict, carrying only the data its strategy needs.
pub enum Layout<'a> {
    /// A table with a header row and at least two data rows.
    Tabular { table: ElementRef<'a> },
    /// Sibling elements sharing a similar internal shape.
    Container { items: Vec<ElementRef<'a>> },
    /// A results region with repeated field labels but no usable structure.
    Text { region: String },
    /// Nothing extractable on this page.
    NoResults,
}

/// Layout family without the borrowed anchors, for page metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutKind {
    Tabular,
    Container,
    Text,
    NoResults,
}

impl Layout<'_> {
    pub fn kind(&self) -> LayoutKind {
        match self {
            Layout::Tabular { .. } => LayoutKind::Tabular,
            Layout::Container { .. } => LayoutKind::Container,
            Layout::Text { .. } => LayoutKind::Text,
            Layout::NoResults => LayoutKind::NoResults,
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tabular => "tabular",
            Self::Container => "container",
            Self::Text => "text",
            Self::NoResults => "no_results",
        };
        f.write_str(s)
    }
}

fn sel(source: &str) -> Selector {
    Selector::parse(source).expect("selector is valid")
}

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| sel("table"))
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| sel("tr"))
}

fn header_cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| sel("th"))
}

/// Classify a parsed page. First match in the decision order wins.
pub fn classify<'a>(doc: &'a Html, ctx: &ExtractContext<'_>) -> Layout<'a> {
    if let Some(table) = find_data_table(doc) {
        if ctx.debug {
            debug!("classifier: tabular layout (table with data rows)");
        }
        return Layout::Tabular { table };
    }

    if let Some(items) = find_containers(doc, ctx) {
        if ctx.debug {
            debug!(count = items.len(), "classifier: container layout");
        }
        return Layout::Container { items };
    }

    let body_text = page_text(doc);

    // An explicit empty-result marker beats text-pattern scanning: label
    // words often appear in search-form chrome around the marker.
    let lower = body_text.to_lowercase();
    if NO_RESULTS_MARKERS.iter().any(|m| lower.contains(m)) {
        if ctx.debug {
            debug!("classifier: explicit no-results marker");
        }
        return Layout::NoResults;
    }

    let labels = ctx.matcher.distinct_fields(&body_text);
    if labels >= MIN_TEXT_LABELS {
        if ctx.debug {
            debug!(labels, "classifier: text layout");
        }
        return Layout::Text { region: body_text };
    }

    warn!("page matched no layout family confidently; treating as no results");
    Layout::NoResults
}

// ─── Tabular detection ───────────────────────────────────────────────────────

/// First table with a header row (explicit `th`, or the first row as an
/// implicit header) and at least two data rows.
fn find_data_table(doc: &Html) -> Option<ElementRef<'_>> {
    for table in doc.select(table_selector()) {
        let rows: Vec<_> = table.select(row_selector()).collect();
        let has_explicit_header = rows
            .first()
            .map(|r| r.select(header_cell_selector()).next().is_some())
            .unwrap_or(false);
        // Either way the first row serves as the header, leaving the rest
        // as data rows; two of them make it a results table.
        let data_rows = rows.len().saturating_sub(1);
        if data_rows >= 2 && (has_explicit_header || rows.len() >= 3) {
            return Some(table);
        }
    }
    None
}

// ─── Container detection ─────────────────────────────────────────────────────

/// Find sibling elements that look like repeated record containers: class
/// hints first, then a generic scan over every parent's element children.
fn find_containers<'a>(doc: &'a Html, ctx: &ExtractContext<'_>) -> Option<Vec<ElementRef<'a>>> {
    for hint in CONTAINER_CLASS_HINTS {
        let hinted = drop_nested(doc.select(&sel(hint)).collect());
        if let Some(group) = similar_shaped(&hinted, ctx) {
            return Some(group);
        }
    }

    for parent in doc.select(&sel("body, body *")) {
        if matches!(parent.value().name(), "table" | "thead" | "tbody" | "tr") {
            continue;
        }
        let children: Vec<ElementRef<'a>> =
            parent.children().filter_map(ElementRef::wrap).collect();
        if children.len() < MIN_CONTAINERS {
            continue;
        }
        // Group siblings by tag; a repeated record list shares one tag.
        let mut tags: Vec<&str> = children.iter().map(|c| c.value().name()).collect();
        tags.sort_unstable();
        tags.dedup();
        for tag in tags {
            let group: Vec<_> = children
                .iter()
                .copied()
                .filter(|c| c.value().name() == tag)
                .collect();
            if group.len() < MIN_CONTAINERS {
                continue;
            }
            if let Some(kept) = similar_shaped(&group, ctx) {
                return Some(kept);
            }
        }
    }
    None
}

/// Drop candidates that contain another candidate: a wrapper whose class
/// also matches the hint would otherwise swallow its own children.
fn drop_nested(items: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    items
        .iter()
        .copied()
        .filter(|el| {
            !items
                .iter()
                .any(|other| other.id() != el.id() && other.ancestors().any(|a| a.id() == el.id()))
        })
        .collect()
}

/// Keep candidates whose internal shape is similar: each must carry at
/// least one recognized field label, and the labeled-element counts must
/// agree within the configured tolerance.
fn similar_shaped<'a>(
    candidates: &[ElementRef<'a>],
    ctx: &ExtractContext<'_>,
) -> Option<Vec<ElementRef<'a>>> {
    let mut labeled: Vec<(ElementRef<'a>, usize)> = candidates
        .iter()
        .map(|el| (*el, ctx.matcher.distinct_fields(&element_text(el))))
        .filter(|(_, count)| *count >= 1)
        .collect();
    if labeled.len() < MIN_CONTAINERS {
        return None;
    }

    // Compare against the modal label count rather than the first element,
    // so one outlier card cannot poison the group.
    let mut counts: Vec<usize> = labeled.iter().map(|(_, c)| *c).collect();
    counts.sort_unstable();
    let reference = counts[counts.len() / 2];

    labeled.retain(|(_, count)| count.abs_diff(reference) <= ctx.similarity_threshold);
    if labeled.len() >= MIN_CONTAINERS {
        Some(labeled.into_iter().map(|(el, _)| el).collect())
    } else {
        None
    }
}

// ─── Text helpers ────────────────────────────────────────────────────────────

/// Visible text of an element, whitespace-collapsed.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text of the whole page, one line per text node so block
/// splitting has boundaries to work with.
pub(crate) fn page_text(doc: &Html) -> String {
    let body = doc.select(&sel("body")).next();
    let Some(body) = body else {
        return String::new();
    };
    body.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
