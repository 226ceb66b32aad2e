//! Tolerant label recognition, shared by every layout strategy.
//!
//! A label can appear as a table header ("Sale Date"), inline with a colon
//! ("Owner: JANE DOE"), abbreviated ("Sq Ft", "PCN"), or dotted ("Sq. Ft.").
//! The matcher compiles each candidate label from the [`field_specs`] table
//! into a case-insensitive regex that absorbs periods and flexible
//! whitespace, then resolves overlapping hits by the longest literal
//! candidate. Mapping behavior is therefore identical whether a fragment was
//! carved from a table row, a container, or a text block.

use crate::schema::{field_specs, FieldName};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How aggressively labels are recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Primary labels only, for portals with clean headings.
    Strict,
    /// Primary labels plus abbreviation/jargon aliases.
    #[default]
    Fuzzy,
}

/// One recognized label occurrence inside a text span.
#[derive(Debug, Clone, Copy)]
pub struct LabelMatch {
    pub field: FieldName,
    /// Byte offset where the label starts.
    pub start: usize,
    /// Byte offset just past the label (value text begins here).
    pub end: usize,
    /// Length of the candidate literal, for the most-specific tie-break.
    pub literal_len: usize,
}

struct LabelPattern {
    field: FieldName,
    literal_len: usize,
    regex: Regex,
}

/// Compiled recognizer over the whole field spec table.
pub struct LabelMatcher {
    patterns: Vec<LabelPattern>,
}

impl LabelMatcher {
    pub fn new(mode: MatchMode) -> Self {
        let mut patterns = Vec::new();
        for spec in field_specs() {
            for candidate in spec.primary {
                patterns.push(compile(spec.name, candidate));
            }
            if mode == MatchMode::Fuzzy {
                for candidate in spec.aliases {
                    patterns.push(compile(spec.name, candidate));
                }
            }
        }
        Self { patterns }
    }

    /// Resolve a header cell (or any short label text) to a field.
    ///
    /// The longest literal candidate found anywhere in the text wins, so
    /// "Sale Date" resolves to the date field even though "sale" and "date"
    /// also hit.
    pub fn match_label(&self, text: &str) -> Option<FieldName> {
        self.find_all(text)
            .into_iter()
            .max_by_key(|m| m.literal_len)
            .map(|m| m.field)
    }

    /// All label occurrences in a text span, overlap-resolved and sorted by
    /// position. On overlapping spans the longer literal candidate wins.
    pub fn scan(&self, text: &str) -> Vec<LabelMatch> {
        let mut matches = self.find_all(text);
        matches.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(b.literal_len.cmp(&a.literal_len))
        });

        let mut resolved: Vec<LabelMatch> = Vec::with_capacity(matches.len());
        for m in matches {
            match resolved.last_mut() {
                Some(last) if m.start < last.end => {
                    if m.literal_len > last.literal_len {
                        *last = m;
                    }
                }
                _ => resolved.push(m),
            }
        }
        resolved
    }

    /// How many distinct fields have a label somewhere in the text. Used by
    /// the layout classifier to judge whether a region looks like records.
    pub fn distinct_fields(&self, text: &str) -> usize {
        let mut seen = [false; FieldName::COUNT];
        for m in self.scan(text) {
            seen[m.field as usize] = true;
        }
        seen.iter().filter(|s| **s).count()
    }

    fn find_all(&self, text: &str) -> Vec<LabelMatch> {
        let mut out = Vec::new();
        for pattern in &self.patterns {
            for hit in pattern.regex.find_iter(text) {
                out.push(LabelMatch {
                    field: pattern.field,
                    start: hit.start(),
                    end: hit.end(),
                    literal_len: pattern.literal_len,
                });
            }
        }
        out
    }
}

/// Build the tolerant regex for one candidate label: word-bounded tokens,
/// optional trailing periods, flexible whitespace between tokens.
fn compile(field: FieldName, candidate: &str) -> LabelPattern {
    let tokens: Vec<String> = candidate
        .split_whitespace()
        .map(|t| format!("{}\\.?", regex::escape(t)))
        .collect();
    let pattern = format!(r"(?i)\b{}\b", tokens.join(r"\s*"));
    LabelPattern {
        field,
        literal_len: candidate.len(),
        regex: Regex::new(&pattern).expect("label pattern is valid"),
    }
}
