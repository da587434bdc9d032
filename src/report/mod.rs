//! Report builders
//!
//! Each builder reads a snapshot of the config database through a
//! `MetadataStore` and composes a nested, serializable report:
//! - `status`: routers, balancer, collections, shards, log coverage
//! - `splits`: hourly split activity over the last 24 hours
//! - `chunks`: chunk distribution, largest collections, jumbo chunks

pub mod chunks;
pub mod section;
pub mod splits;
pub mod status;

pub use chunks::{ChunkReport, ChunkReportBuilder, ChunkSection};
pub use section::{report_value, select_section, Report, ReportSection};
pub use splits::{SplitActivityReport, SplitActivityReportBuilder};
pub use status::{StatusReport, StatusReportBuilder, StatusSection};

use chrono::FixedOffset;
use serde_json::Value;

use crate::client::MetadataStoreExt;
use crate::config::Command;
use crate::utils::Result;

/// Build the report a command asks for and narrow it to the requested section
pub fn run_command<S: MetadataStoreExt + ?Sized>(
    store: &S,
    command: &Command,
    display_offset: FixedOffset,
) -> Result<Value> {
    match command {
        Command::Status { section } => {
            let report = StatusReportBuilder::new(store)
                .display_offset(display_offset)
                .build()?;
            select_section(&report, *section)
        }
        Command::Splits => report_value(&SplitActivityReportBuilder::new(store).build()?),
        Command::Chunks { section } => {
            let report = ChunkReportBuilder::new(store).build()?;
            select_section(&report, *section)
        }
    }
}
