//! Drives page extraction across a paginated result set.
//!
//! One page at a time — page N+1's existence is only knowable after page N
//! is on screen, so there is nothing to parallelize. The walk stops when
//! the navigator has no next control, the page bound is reached, the loop
//! guard trips (a broken "next" control that reloads the same page), the
//! cancellation flag is raised, or the navigator fails. A failure aborts
//! the walk but never the results: pages already extracted are returned.

use crate::error::NavigationError;
use crate::extract::page::{extract_page, PageResult};
use crate::extract::ExtractContext;
use crate::navigator::PageNavigator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Why the walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// No next-page control on the last page. The normal ending.
    Exhausted,
    /// The configured page bound was reached with pages still ahead.
    LimitReached,
    /// Two consecutive pages produced identical content.
    LoopDetected,
    /// The cancellation flag was raised between pages.
    Cancelled,
    /// The navigator failed; partial results preserved.
    Aborted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exhausted => "exhausted",
            Self::LimitReached => "limit_reached",
            Self::LoopDetected => "loop_detected",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Everything a walk produced, including how it ended.
pub struct WalkOutcome {
    pub pages: Vec<PageResult>,
    pub stop: StopReason,
    pub error: Option<NavigationError>,
}

/// Walk up to `max_pages` pages through the navigator, extracting each.
pub fn walk(
    navigator: &mut dyn PageNavigator,
    ctx: &ExtractContext<'_>,
    max_pages: u32,
    cancel: Option<&AtomicBool>,
) -> WalkOutcome {
    let mut pages: Vec<PageResult> = Vec::new();
    let mut previous_hash: Option<u64> = None;

    for page_index in 0..max_pages {
        // Single cooperative check point: once extraction of a page starts
        // it runs to completion.
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!(pages = pages.len(), "walk cancelled");
            return outcome(pages, StopReason::Cancelled, None);
        }

        let markup = match navigator.current_markup() {
            Ok(markup) => markup,
            Err(err) => {
                warn!(page = page_index, error = %err, "markup unavailable; aborting walk");
                return outcome(pages, StopReason::Aborted, Some(err));
            }
        };

        let page = extract_page(&markup, page_index, ctx);
        let hash = page.content_hash;
        let repeated = previous_hash == Some(hash);
        pages.push(page);

        if repeated {
            warn!(
                page = page_index,
                "consecutive pages identical; stopping to avoid a pagination loop"
            );
            return outcome(pages, StopReason::LoopDetected, None);
        }
        previous_hash = Some(hash);

        let control = match navigator.find_next_control() {
            Ok(control) => control,
            Err(err) => {
                warn!(page = page_index, error = %err, "next-control lookup failed; aborting walk");
                return outcome(pages, StopReason::Aborted, Some(err));
            }
        };
        let Some(control) = control else {
            return outcome(pages, StopReason::Exhausted, None);
        };

        if page_index + 1 >= max_pages {
            info!(max_pages, "page bound reached with pages still ahead");
            return outcome(pages, StopReason::LimitReached, None);
        }

        if let Err(err) = navigator.activate(&control) {
            warn!(page = page_index, error = %err, "next-page activation failed; aborting walk");
            return outcome(pages, StopReason::Aborted, Some(err));
        }
    }

    outcome(pages, StopReason::LimitReached, None)
}

fn outcome(pages: Vec<PageResult>, stop: StopReason, error: Option<NavigationError>) -> WalkOutcome {
    WalkOutcome { pages, stop, error }
}
