//! Configuration module

pub mod cli;
pub mod report_config;

pub use cli::{CliArgs, Command, OutputFormat};
pub use report_config::{log_level, ReportConfig};
