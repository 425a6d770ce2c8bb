//! Extraction engine for JavaScript-rendered, embedded BI dashboards.
//!
//! A [`run::DashboardRun`] drives one browser [`session::Session`] through
//! render-readiness detection, date filtering and page-by-page pagination,
//! extracting each selected page into a [`model::DashboardPage`]. The
//! resulting [`run::RunReport`] is consolidated and written out by
//! [`export::write_report`].

pub mod browser;
pub mod consolidate;
pub mod error;
pub mod export;
pub mod extract;
pub mod filter;
pub mod model;
pub mod pagination;
pub mod readiness;
pub mod run;
pub mod session;

#[cfg(test)]
mod testing;

pub use browser::{launch_session, BrowserOptions};
pub use error::{ExtractError, Notice, Outcome, SessionError, Stage};
pub use extract::{extract_markup, ExtractOptions, StructuredExtractor};
pub use model::{ConsolidatedRow, DashboardPage};
pub use pagination::PageSelection;
pub use run::{DashboardRun, RunConfig, RunReport, RunSummary};
