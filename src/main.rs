//! fieldmap - command line entry point
//!
//! Logs go to stderr so the mapped record on stdout stays machine-readable.

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use fieldmap::cli::{self, Cli, Commands};

/// Initialize the logger with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env() // Allows RUST_LOG env var to override
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Check { mapping } => {
            info!("Validating mapping file: {:?}", mapping);
            match cli::run_check(&mapping) {
                Ok(loaded) => {
                    info!("Mapping validation successful");
                    println!("✓ Mapping is valid: {} field(s)", loaded.fields.len());
                }
                Err(e) => {
                    error!("Mapping validation failed: {:#}", e);
                    eprintln!("✗ Mapping validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Map {
            mapping,
            input,
            target,
            severity,
            compact,
        } => {
            info!("Mapping record with {:?}", mapping);
            let rendered = cli::run_map(
                &mapping,
                input.as_deref(),
                target.as_deref(),
                severity,
                compact,
            )?;
            println!("{}", rendered);
        }
    }

    Ok(())
}
