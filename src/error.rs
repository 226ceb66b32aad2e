//! Error taxonomy for the extraction engine.
//!
//! Fragment-level rejections are recovered where they occur: the fragment is
//! dropped, counted, and extraction continues. Only navigation-level and
//! configuration-level errors surface to the caller, and navigation errors
//! always arrive bundled with whatever partial results were already gathered.

use thiserror::Error;

/// Why a single fragment failed to become a record.
///
/// Never escalates past the page that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The fragment's text contained no recognizable field at all.
    #[error("fragment contains no recognizable fields")]
    EmptyFragment,
    /// Fields were recognized but neither a parcel id nor a property
    /// address was among them.
    #[error("fragment has no parcel id or property address")]
    NoKeyFieldFound,
}

/// The browser/session collaborator could not supply or advance a page.
///
/// Surfaced to the pagination walker, which aborts the walk and returns the
/// pages already extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The collaborator could not produce markup for the current page.
    #[error("page markup unavailable: {0}")]
    MarkupUnavailable(String),
    /// The next-page control existed but could not be activated.
    #[error("next-page control could not be activated: {0}")]
    ActivationFailed(String),
    /// The underlying session is gone (browser closed, connection lost).
    #[error("navigation session lost: {0}")]
    SessionLost(String),
}

/// Invalid run configuration. Fatal at session construction, before any
/// page is visited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_pages` of zero would make the walker a no-op.
    #[error("max_pages must be at least 1 (got {0})")]
    InvalidMaxPages(u32),
}
