//! Metaschema Compile CLI
//!
//! Compiles one source document and prints the resulting schema.
//!
//! Usage:
//!   metaschema-compile schema/vrs/vrs-source.yaml
//!   metaschema-compile schema/vrs/vrs-source.yaml --merge-imports --format yaml

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use metaschema::{compile, render, CompilerConfig, OutputFormat};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metaschema-compile")]
#[command(about = "Compile a metaschema source document into JSON Schema")]
struct Cli {
    /// Source document (YAML or JSON)
    infile: PathBuf,

    /// Fold imported documents into the output
    #[arg(long)]
    merge_imports: bool,

    /// Output format (json, yaml)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CompilerConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    if cli.merge_imports {
        config.compile.merge_imports = true;
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }

    let document = compile(&cli.infile, &config)
        .with_context(|| format!("failed to compile {}", cli.infile.display()))?;
    let text = render(
        &Value::Object(document.output().clone()),
        config.output.format,
        config.output.indent,
    )?;
    print!("{}", text);
    Ok(())
}
