//! Parcelsift — structure-adaptive extraction engine for property record
//! result pages.
//!
//! Government property portals render search results in whatever markup the
//! vendor shipped that decade: data tables, repeated card containers, or a
//! wall of labeled text. This crate turns any of those into a fixed 18-field
//! record set. The engine is layered, leaves first:
//!
//! 1. **Normalizers** coerce raw tokens (currency, dates, areas, counts)
//!    into typed values and never fail.
//! 2. **Label matching** recognizes field labels tolerantly (abbreviations,
//!    punctuation, header vs inline) and is shared by every layout strategy.
//! 3. **Layout classification** decides tabular / container / text /
//!    no-results for each page, preferring positional structure.
//! 4. **Page extraction** carves one fragment per candidate record and maps
//!    each in isolation — one bad record never drops the rest of the page.
//! 5. **Pagination walking** drives extraction across pages with a loop
//!    guard and a hard page bound, preserving partial results on failure.
//!
//! The browser is not driven here: markup arrives already materialized
//! through the [`navigator::PageNavigator`] trait, satisfiable by a live
//! browser session, a recorded fixture, or a test double equally well.

pub mod error;
pub mod export;
pub mod extract;
pub mod navigator;
pub mod schema;
pub mod session;

pub use error::{ConfigError, NavigationError, RejectReason};
pub use navigator::{FixtureNavigator, NextPageControl, PageNavigator};
pub use schema::{FieldName, FieldValue, PropertyRecord};
pub use session::{ExtractionSession, SessionConfig, SessionReport};
