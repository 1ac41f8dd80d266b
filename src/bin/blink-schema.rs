//! blink-schema
//!
//! Check, format and describe Blink schema files.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blink::exchange::{build_transitive, describe, encode_descriptor};
use blink::{NsName, Schema, SchemaBuilder, SchemaError};

#[derive(Parser)]
#[command(name = "blink-schema")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Blink schema tool", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate schema files and report diagnostics
    Check {
        /// Schema files, resolved together
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the normalized schema text
    Fmt {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the exchange descriptors for a group and its dependencies
    Describe {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Group name, `ns:Name` or `Name`
        #[arg(short, long)]
        group: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Blink(#[from] blink::Error),

    #[error("no group named '{0}'")]
    UnknownGroup(String),
}

impl From<blink::CodecError> for CliError {
    fn from(e: blink::CodecError) -> Self {
        CliError::Blink(e.into())
    }
}

fn load(files: &[PathBuf]) -> Result<Schema, CliError> {
    let mut builder = SchemaBuilder::new();
    for path in files {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
        builder.parse_str(&path.display().to_string(), &text)?;
        debug!(path = %path.display(), "parsed schema file");
    }
    Ok(builder.finalize()?)
}

fn cmd_check(files: &[PathBuf]) -> Result<String, CliError> {
    let schema = load(files)?;
    info!(
        groups = schema.groups().len(),
        enums = schema.enums().len(),
        defines = schema.defines().len(),
        "schema is valid"
    );
    Ok(format!(
        "ok: {} groups, {} enums, {} defines\n",
        schema.groups().len(),
        schema.enums().len(),
        schema.defines().len()
    ))
}

fn cmd_fmt(files: &[PathBuf]) -> Result<String, CliError> {
    Ok(load(files)?.to_string())
}

fn cmd_describe(files: &[PathBuf], group: &str) -> Result<String, CliError> {
    let schema = load(files)?;
    let root = NsName::parse(group);
    if schema.find_group(&root).is_none() {
        return Err(CliError::UnknownGroup(group.to_string()));
    }

    let mut out = String::new();
    for def in build_transitive(&schema, &root)? {
        let mut bytes = Vec::new();
        encode_descriptor(&describe(&schema, def), &mut bytes)?;
        let _ = write!(out, "{} ", schema.def_name(def));
        for b in &bytes {
            let _ = write!(out, "{:02x}", b);
        }
        out.push('\n');
    }
    Ok(out)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match &cli.command {
        Commands::Check { files } => cmd_check(files),
        Commands::Fmt { files } => cmd_fmt(files),
        Commands::Describe { files, group } => cmd_describe(files, group),
    };

    match result {
        Ok(text) => {
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
