//! Aggregation and reporting
//!
//! This module provides:
//! - Client-side group-and-count used by the report builders
//! - JSON/text rendering and file export

pub mod grouping;
pub mod reporter;

pub use grouping::GroupCounter;
pub use reporter::{render_text, ReportRenderer};
