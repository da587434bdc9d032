//! Report section selection
//!
//! Every report exposes a closed set of top-level sections. The set is an
//! enum (so the CLI can only name real sections) and is checked against the
//! composed report's keys whenever a section is selected.

use serde::Serialize;
use serde_json::Value;

use crate::utils::{ReportError, Result};

/// Closed set of top-level report keys
pub trait ReportSection: Copy + 'static {
    /// Key of this section in the composed report
    fn key(self) -> &'static str;

    /// Every section, in report order
    fn all() -> &'static [Self];
}

/// A composed report whose top-level keys are `Self::Section`
pub trait Report: Serialize {
    type Section: ReportSection;

    /// Report name used in diagnostics
    const NAME: &'static str;
}

/// Serialize any report into a JSON value
pub fn report_value<R: Serialize>(report: &R) -> Result<Value> {
    serde_json::to_value(report).map_err(|e| ReportError::Render(e.to_string()))
}

/// Return the whole report, or exactly one of its sections.
///
/// Fails when the report's keys and its section set disagree, which means
/// the section enum and the report struct have drifted apart.
pub fn select_section<R: Report>(report: &R, section: Option<R::Section>) -> Result<Value> {
    let value = report_value(report)?;
    let Some(section) = section else {
        return Ok(value);
    };

    let Value::Object(mut map) = value else {
        return Err(ReportError::Render(format!(
            "{} report did not serialize to an object",
            R::NAME
        )));
    };

    let keys: Vec<&str> = R::Section::all().iter().map(|s| s.key()).collect();
    if let Some(extra) = map.keys().find(|k| !keys.contains(&k.as_str())) {
        return Err(ReportError::UnknownSection {
            section: extra.clone(),
            report: R::NAME,
        });
    }

    map.remove(section.key()).ok_or_else(|| ReportError::UnknownSection {
        section: section.key().to_string(),
        report: R::NAME,
    })
}
