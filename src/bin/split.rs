//! Metaschema Split CLI
//!
//! Compiles one source document and writes one standalone schema per class.
//!
//! Usage:
//!   metaschema-split schema/vrs/vrs-source.yaml
//!   metaschema-split schema/vrs/vrs-source.yaml --output out/json --merge-imports

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use metaschema::{compile, split_document, write_artifacts, CompilerConfig, OutputFormat};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metaschema-split")]
#[command(about = "Write one JSON Schema document per class of a metaschema source")]
struct Cli {
    /// Source document (YAML or JSON)
    infile: PathBuf,

    /// Output directory (default: <source dir>/<format>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (json, yaml)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Fold imported documents into the root before splitting
    #[arg(long)]
    merge_imports: bool,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
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
    if let Some(output) = cli.output {
        config.output.directory = Some(output);
    }

    let document = compile(&cli.infile, &config)
        .with_context(|| format!("failed to compile {}", cli.infile.display()))?;
    let artifacts = split_document(&document, config.output.format)?;
    let directory = config.output_dir(&cli.infile);
    let report = write_artifacts(
        &artifacts,
        &directory,
        config.output.format,
        config.output.indent,
        config.output.checksums,
    )
    .with_context(|| format!("failed to write {}", directory.display()))?;

    println!(
        "Wrote {} class documents to {}",
        report.files.len(),
        report.directory.display()
    );
    Ok(())
}
