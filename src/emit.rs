//! Serialization of compiled documents
//!
//! Everything is rendered in memory first; files are only written once every
//! artifact has rendered, so a failure never leaves a partial output set.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum::{manifest, Checksum};
use crate::config::OutputFormat;
use crate::error::{Result, SchemaError};
use crate::split::ClassArtifact;

/// Name of the manifest written next to per-class documents
pub const CHECKSUM_FILE: &str = "checksums.sha256";

/// Render a document as JSON (with `indent` spaces) or YAML
pub fn render(value: &Value, format: OutputFormat, indent: usize) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let indent = " ".repeat(indent);
            let mut buf = Vec::new();
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut ser)?;
            buf.push(b'\n');
            String::from_utf8(buf)
                .map_err(|e| SchemaError::InvalidFormat(format!("rendered JSON is not UTF-8: {}", e)))
        }
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
    }
}

/// Summary of one write
#[derive(Debug, Clone)]
pub struct WriteReport {
    pub directory: PathBuf,
    pub files: Vec<(String, Checksum)>,
}

/// Write one file per artifact into `directory`, plus the checksum manifest
pub fn write_artifacts(
    artifacts: &[ClassArtifact],
    directory: &Path,
    format: OutputFormat,
    indent: usize,
    checksums: bool,
) -> Result<WriteReport> {
    let mut rendered = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let content = render(&Value::Object(artifact.document.clone()), format, indent)?;
        rendered.push((artifact.class_name.clone(), content));
    }

    fs::create_dir_all(directory)?;
    let mut files = Vec::with_capacity(rendered.len());
    for (name, content) in rendered {
        fs::write(directory.join(&name), &content)?;
        tracing::debug!(class = %name, bytes = content.len(), "wrote class document");
        files.push((name, Checksum::from_bytes(content.as_bytes())));
    }

    if checksums {
        fs::write(directory.join(CHECKSUM_FILE), manifest(&files))?;
    }
    tracing::info!(
        directory = %directory.display(),
        files = files.len(),
        "wrote per-class documents"
    );

    Ok(WriteReport {
        directory: directory.to_path_buf(),
        files,
    })
}
