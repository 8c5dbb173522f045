//! Configuration management for the compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (metaschema.toml)
//! - Environment variables (METASCHEMA__*)
//!
//! ## Example config file (metaschema.toml):
//! ```toml
//! [output]
//! format = "json"
//! directory = "./json"
//! indent = 3
//! checksums = true
//!
//! [compile]
//! merge_imports = false
//! enforce_ordered = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::document::ModeOverrides;

/// Main configuration for the compiler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Pipeline settings
    #[serde(default)]
    pub compile: CompileConfig,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Serialization format of emitted documents
    #[serde(default)]
    pub format: OutputFormat,

    /// Directory for per-class documents (defaults to `<source dir>/<format>`)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// JSON indentation width
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Write checksums.sha256 next to per-class documents
    #[serde(default = "default_true")]
    pub checksums: bool,
}

/// Output format for emitted documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// Directory name used in class URIs and default output paths
    pub fn dir_name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Merge imported documents into the root before emitting
    #[serde(default)]
    pub merge_imports: bool,

    /// Override the root document's `strict` flag
    #[serde(default)]
    pub strict: Option<bool>,

    /// Override the root document's `enforce_ordered` flag
    #[serde(default)]
    pub enforce_ordered: Option<bool>,
}

impl CompileConfig {
    pub fn overrides(&self) -> ModeOverrides {
        ModeOverrides {
            strict: self.strict,
            enforce_ordered: self.enforce_ordered,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_indent() -> usize {
    3
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            directory: None,
            indent: default_indent(),
            checksums: true,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["metaschema.toml", ".metaschema.toml", "config/metaschema.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "metaschema", "metaschema") {
            let xdg_config = config_dir.config_dir().join("metaschema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Load from environment variables (METASCHEMA__*)
        builder = builder.add_source(
            Environment::with_prefix("METASCHEMA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Where per-class documents for `source` are written
    pub fn output_dir(&self, source: &Path) -> PathBuf {
        match &self.output.directory {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(self.output.format.dir_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.indent, 3);
        assert!(config.output.checksums);
        assert!(!config.compile.merge_imports);
        assert_eq!(config.compile.overrides(), ModeOverrides::default());
    }

    #[test]
    fn test_serialize_config() {
        let config = CompilerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[compile]"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metaschema.toml");
        std::fs::write(
            &path,
            "[output]\nformat = \"yaml\"\nindent = 2\n\n[compile]\nmerge_imports = true\nenforce_ordered = false\n",
        )
        .unwrap();
        let config = CompilerConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert_eq!(config.output.indent, 2);
        assert!(config.compile.merge_imports);
        assert_eq!(config.compile.overrides().enforce_ordered, Some(false));
        assert_eq!(config.compile.overrides().strict, None);
    }

    #[test]
    fn test_output_dir_defaults_next_to_source() {
        let config = CompilerConfig::default();
        assert_eq!(
            config.output_dir(Path::new("schema/vrs/vrs-source.yaml")),
            PathBuf::from("schema/vrs/json")
        );
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
