//! shard-report - diagnostic reports for sharded MongoDB clusters
//!
//! Reads the cluster's config database and prints one of three reports:
//! `status`, `splits` or `chunks`.

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

use shard_report::client::MongoStore;
use shard_report::config::{CliArgs, ReportConfig};
use shard_report::metrics::ReportRenderer;
use shard_report::report::run_command;
use shard_report::utils::ReportError;

/// Build the subscriber for one run; diagnostics go to stderr so the
/// report on stdout stays machine-readable.
fn log_subscriber(config: &ReportConfig) -> impl tracing::Subscriber + Send + Sync + 'static {
    FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .finish()
}

fn execute(config: &ReportConfig) -> shard_report::utils::Result<()> {
    info!(
        "connecting to {} (database '{}')",
        config.uri, config.database
    );
    let store = MongoStore::connect(config)?;

    debug!("running {:?}", config.command);
    let report = run_command(&store, &config.command, config.display_offset)?;

    let renderer = ReportRenderer::new(config.format);
    match config.output_path {
        Some(ref path) => {
            info!("Writing report to: {:?}", path);
            renderer.write_file(path, &report)
        }
        None => renderer.print(&report),
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments; --version and --help exit here without a store
    let args = CliArgs::parse_args();

    let config = ReportConfig::from_cli(&args).map_err(ReportError::Configuration)?;

    tracing::subscriber::with_default(log_subscriber(&config), || execute(&config))?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<ReportError>() {
            Some(report_error) if report_error.is_operational() => {
                eprintln!("Error: {}", report_error);
                std::process::exit(1);
            }
            _ => {
                eprintln!("{:?}", e);
                eprintln!(
                    "shard-report v{} hit an unexpected condition. \
                     Please report this issue to the maintainers with the output above.",
                    env!("CARGO_PKG_VERSION")
                );
                std::process::exit(2);
            }
        }
    }
}
