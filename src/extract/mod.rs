//! Structure-adaptive page extraction.
//!
//! Three strategies, one field mapper. The classifier inspects a page's
//! markup skeleton and picks the strategy; the page extractor carves one
//! raw fragment per candidate record; the field mapper turns each fragment
//! into a canonical record using the shared label matcher. Tabular and
//! container layouts carry positional structure and are preferred over free
//! text whenever present.

pub mod classifier;
pub mod field_mapper;
pub mod page;

use crate::schema::labels::LabelMatcher;
use url::Url;

/// Shared knobs threaded through classification and extraction.
pub struct ExtractContext<'m> {
    pub matcher: &'m LabelMatcher,
    /// Tolerance for the container-layout shape comparison (§ sibling scan).
    pub similarity_threshold: usize,
    /// Emit per-fragment classifier/mapper decisions. No behavior change.
    pub debug: bool,
    /// Base for resolving relative record links found in fragments.
    pub base_url: Option<Url>,
}

impl<'m> ExtractContext<'m> {
    pub fn new(matcher: &'m LabelMatcher) -> Self {
        Self {
            matcher,
            similarity_threshold: 2,
            debug: false,
            base_url: None,
        }
    }

    /// Resolve a possibly-relative href against the configured base.
    pub(crate) fn resolve_link(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}
