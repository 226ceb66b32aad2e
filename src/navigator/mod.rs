//! Browser/session collaborator abstraction.
//!
//! The engine never manages sessions, cookies, or timeouts — it only asks
//! "what is on screen now" and "move forward". [`PageNavigator`] can be
//! satisfied by a live browser, a recorded fixture, or a test double
//! equally well; [`FixtureNavigator`] ships the recorded-fixture form and
//! is what the integration tests drive.

use crate::error::NavigationError;
use scraper::{Html, Selector};

/// Opaque handle to a next-page affordance. The token is meaningful only
/// to the navigator that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPageControl(String);

impl NextPageControl {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

/// Supplies already-materialized markup and forward navigation.
pub trait PageNavigator {
    /// Markup of whatever page is currently presented.
    fn current_markup(&mut self) -> Result<String, NavigationError>;

    /// Locate the next-page affordance on the current page, if any.
    fn find_next_control(&mut self) -> Result<Option<NextPageControl>, NavigationError>;

    /// Activate a previously located control, advancing to the next page.
    fn activate(&mut self, control: &NextPageControl) -> Result<(), NavigationError>;
}

// ─── Recorded fixtures ───────────────────────────────────────────────────────

/// Navigator over a pre-recorded sequence of pages.
pub struct FixtureNavigator {
    pages: Vec<String>,
    cursor: usize,
}

impl FixtureNavigator {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages, cursor: 0 }
    }

    pub fn single(page: impl Into<String>) -> Self {
        Self::new(vec![page.into()])
    }
}

impl PageNavigator for FixtureNavigator {
    fn current_markup(&mut self) -> Result<String, NavigationError> {
        self.pages
            .get(self.cursor)
            .cloned()
            .ok_or_else(|| NavigationError::MarkupUnavailable("fixture exhausted".into()))
    }

    fn find_next_control(&mut self) -> Result<Option<NextPageControl>, NavigationError> {
        if self.cursor + 1 < self.pages.len() {
            Ok(Some(NextPageControl::new((self.cursor + 1).to_string())))
        } else {
            Ok(None)
        }
    }

    fn activate(&mut self, control: &NextPageControl) -> Result<(), NavigationError> {
        let target: usize = control
            .token()
            .parse()
            .map_err(|_| NavigationError::ActivationFailed(control.token().to_string()))?;
        if target >= self.pages.len() {
            return Err(NavigationError::ActivationFailed(format!(
                "fixture has no page {target}"
            )));
        }
        self.cursor = target;
        Ok(())
    }
}

// ─── Shared next-control detection ───────────────────────────────────────────

/// Selectors that locate next-page affordances, strongest signal first.
const NEXT_CONTROL_SELECTORS: &[&str] = &[
    "a[rel='next']",
    "a[href*='next']",
    ".pagination a.next",
    ".pager a.next",
    "input[value*='Next']",
];

/// Scan markup for a next-page affordance so live-browser collaborators can
/// share one detection policy. Returns the control's href (or value text)
/// as the token. The pagination walker itself only ever talks to the
/// [`PageNavigator`] trait.
pub fn detect_next_control(markup: &str) -> Option<NextPageControl> {
    let doc = Html::parse_document(markup);
    for source in NEXT_CONTROL_SELECTORS {
        let selector = Selector::parse(source).expect("next-control selector is valid");
        if let Some(el) = doc.select(&selector).next() {
            let token = el
                .value()
                .attr("href")
                .or_else(|| el.value().attr("value"))
                .unwrap_or("next");
            return Some(NextPageControl::new(token));
        }
    }

    // Fall back on link text: portals often render a bare "Next" anchor.
    let anchors = Selector::parse("a[href]").expect("anchor selector is valid");
    for el in doc.select(&anchors) {
        let text: String = el.text().collect::<String>().trim().to_lowercase();
        if text == "next" || text == "next »" || text == "next >" {
            if let Some(href) = el.value().attr("href") {
                return Some(NextPageControl::new(href));
            }
        }
    }
    None
}
