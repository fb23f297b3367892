use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::deserializer::Deserializer;
use crate::mapping_file::MappingFile;
use crate::types::Severity;

/// fieldmap - declarative JSON field mapping and validation
#[derive(Parser)]
#[command(name = "fieldmap")]
#[command(about = "Map JSON records onto new shapes through validated field resolvers")]
#[command(version)]
pub struct Cli {
    /// Log resolver activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a source record through a mapping file and print the target
    Map {
        /// Path to the mapping file
        #[arg(short, long)]
        mapping: PathBuf,

        /// Source record (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Pre-shaped target record to fill in (defaults to `{}`)
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Override the mapping's default severity (none, warn, error, throw)
        #[arg(short, long)]
        severity: Option<Severity>,

        /// Print the target on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Validate a mapping file
    Check {
        /// Path to the mapping file to validate
        mapping: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Load a mapping, apply an optional severity override, and build the deserializer.
pub fn load_deserializer(mapping: &Path, severity: Option<Severity>) -> Result<Deserializer> {
    let mapping = MappingFile::load_from_file(mapping)?;
    let mut config = mapping.to_config()?;
    if let Some(severity) = severity {
        config = config.with_severity(severity);
    }
    debug!(fields = config.resolvers.len(), severity = %config.severity, "mapping loaded");
    Ok(Deserializer::new(config)?)
}

/// Run the `map` command, returning the rendered target.
pub fn run_map(
    mapping: &Path,
    input: Option<&Path>,
    target: Option<&Path>,
    severity: Option<Severity>,
    compact: bool,
) -> Result<String> {
    let deserializer = load_deserializer(mapping, severity)?;

    let source = match input {
        Some(path) => read_json(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read source record from stdin")?;
            serde_json::from_str(&buffer).context("Failed to parse source record from stdin")?
        }
    };
    let mut record = match target {
        Some(path) => read_json(path)?,
        None => Value::Object(Default::default()),
    };

    deserializer.deserialize(&source, &mut record).map_err(|err| {
        let context = if err.is_reported() {
            "Mapping aborted"
        } else {
            "Failed to write mapped field"
        };
        anyhow::Error::new(err).context(context)
    })?;
    info!("record mapped");

    let rendered = if compact {
        serde_json::to_string(&record)?
    } else {
        serde_json::to_string_pretty(&record)?
    };
    Ok(rendered)
}

/// Run the `check` command.
pub fn run_check(mapping: &Path) -> Result<MappingFile> {
    let loaded = MappingFile::load_from_file(mapping)?;
    loaded.validate()?;
    Ok(loaded)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {:?}", path))
}
