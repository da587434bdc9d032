//! Command-line argument parsing
//!
//! Global connection/output options plus one subcommand per report.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::report::{ChunkSection, StatusSection};

/// Diagnostic reports over a sharded cluster's config database
#[derive(Parser, Debug, Clone)]
#[command(name = "shard-report")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Connection Options =====
    /// Connection string of a router or config server
    #[arg(
        short = 'u',
        long = "uri",
        env = "SHARD_REPORT_URI",
        default_value = "mongodb://localhost:27017",
        global = true
    )]
    pub uri: String,

    /// Name of the metadata database
    #[arg(short = 'd', long = "database", default_value = "config", global = true)]
    pub database: String,

    /// Connect and server selection timeout in milliseconds
    #[arg(long = "connect-timeout-ms", default_value_t = 5000, global = true)]
    pub connect_timeout_ms: u64,

    // ===== Output Options =====
    /// Output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", global = true)]
    pub output: Option<PathBuf>,

    /// Render timestamps in UTC instead of the local offset
    #[arg(long = "utc", global = true)]
    pub utc: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Report to produce
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Cluster status: routers, balancer, collections, shards, log coverage
    Status {
        /// Only print this section of the report
        #[arg(value_enum)]
        section: Option<StatusSection>,
    },
    /// Chunk splits over the last 24 hours of recorded activity
    Splits,
    /// Chunk distribution, largest collections and jumbo chunks
    Chunks {
        /// Only print this section of the report
        #[arg(value_enum)]
        section: Option<ChunkSection>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.database.trim().is_empty() {
            return Err("--database must not be empty".to_string());
        }

        if !(self.uri.starts_with("mongodb://") || self.uri.starts_with("mongodb+srv://")) {
            return Err(format!(
                "--uri must start with mongodb:// or mongodb+srv:// (got '{}')",
                self.uri
            ));
        }

        if self.verbose > 0 && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }

        if self.connect_timeout_ms == 0 {
            return Err("--connect-timeout-ms must be greater than 0".to_string());
        }

        Ok(())
    }
}
