//! Report configuration derived from CLI arguments

use chrono::{FixedOffset, Local, Offset, Utc};
use std::path::PathBuf;
use tracing::Level;

use super::cli::{CliArgs, Command, OutputFormat};

/// Complete run configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    // Connection
    pub uri: String,
    pub database: String,
    pub connect_timeout_ms: u64,

    // Report
    pub command: Command,
    /// Offset used for human-facing timestamps
    pub display_offset: FixedOffset,

    // Output
    pub format: OutputFormat,
    pub output_path: Option<PathBuf>,
    pub log_level: Level,
}

impl ReportConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        args.validate()?;

        let display_offset = if args.utc {
            Utc.fix()
        } else {
            Local::now().offset().fix()
        };

        Ok(Self {
            uri: args.uri.clone(),
            database: args.database.clone(),
            connect_timeout_ms: args.connect_timeout_ms,

            command: args.command.clone(),
            display_offset,

            format: args.format,
            output_path: args.output.clone(),
            log_level: log_level(args.verbose, args.quiet),
        })
    }
}

/// Map `-v` count / `-q` to a maximum log level
pub fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_utc() {
        let args = CliArgs::try_parse_from(["test", "--utc", "-o", "out.json", "splits"]).unwrap();
        let config = ReportConfig::from_cli(&args).unwrap();
        assert_eq!(config.display_offset.local_minus_utc(), 0);
        assert_eq!(config.output_path, Some(PathBuf::from("out.json")));
        assert_eq!(config.command, Command::Splits);
    }

    #[test]
    fn test_from_cli_rejects_invalid() {
        let args = CliArgs::try_parse_from(["test", "--database", " ", "status"]).unwrap();
        assert!(ReportConfig::from_cli(&args).is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0, false), Level::WARN);
        assert_eq!(log_level(1, false), Level::INFO);
        assert_eq!(log_level(2, false), Level::DEBUG);
        assert_eq!(log_level(7, false), Level::TRACE);
        assert_eq!(log_level(0, true), Level::ERROR);
    }
}
