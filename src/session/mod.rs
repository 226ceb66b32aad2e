//! The extraction session: configuration, orchestration, and the run
//! report.
//!
//! A session owns its configuration and report and nothing else; it runs
//! the pagination walker, folds each page into the report as it arrives,
//! and always hands back a report — even a degenerate one with zero
//! records and explanatory counters. A fan-out of independent searches
//! means one session instance per search, no shared state.

pub mod report;
pub mod walker;

pub use report::{PageSummary, SessionReport};
pub use walker::StopReason;

use crate::error::ConfigError;
use crate::extract::ExtractContext;
use crate::navigator::PageNavigator;
use crate::schema::labels::{LabelMatcher, MatchMode};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Recognized run options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pagination bound.
    pub max_pages: u32,
    /// Emit per-fragment classifier/mapper decisions. No behavior change.
    pub debug_mode: bool,
    /// Shape tolerance for the container layout's sibling comparison.
    pub container_similarity_threshold: usize,
    /// Strict matches primary labels only; fuzzy also takes abbreviation
    /// and punctuation variants.
    pub label_match_mode: MatchMode,
    /// Base URL for resolving relative record links.
    pub base_url: Option<String>,
    /// External cancellation signal, checked between pages.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            debug_mode: false,
            container_similarity_threshold: 2,
            label_match_mode: MatchMode::Fuzzy,
            base_url: None,
            cancel_flag: None,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidMaxPages(self.max_pages));
        }
        Ok(())
    }
}

/// Orchestrates one extraction run.
pub struct ExtractionSession {
    config: SessionConfig,
    matcher: LabelMatcher,
}

impl ExtractionSession {
    /// Validate configuration and compile the label matcher. Configuration
    /// errors are fatal here, before any page is visited.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let matcher = LabelMatcher::new(config.label_match_mode);
        Ok(Self { config, matcher })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run extraction across the navigator's pages. Always returns a
    /// report; navigation failures are recorded in it alongside the pages
    /// extracted before the failure.
    pub fn run(&self, navigator: &mut dyn PageNavigator) -> SessionReport {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok());
        let ctx = ExtractContext {
            matcher: &self.matcher,
            similarity_threshold: self.config.container_similarity_threshold,
            debug: self.config.debug_mode,
            base_url,
        };

        let outcome = walker::walk(
            navigator,
            &ctx,
            self.config.max_pages,
            self.config.cancel_flag.as_deref(),
        );

        let mut report = SessionReport::new();
        for page in outcome.pages {
            report.absorb(page);
        }
        if let Some(error) = &outcome.error {
            report.record_navigation_error(error);
        }
        report.stop_reason = Some(outcome.stop);

        info!(
            pages = report.pages_visited,
            records = report.records().len(),
            duplicates = report.duplicate_records,
            dropped = report.dropped_records,
            stop = %outcome.stop,
            "extraction session finished"
        );
        report
    }
}
