//! Metaschema Compiler
//!
//! Compiles source schemas written in an extended JSON Schema dialect into
//! plain, standards-conformant JSON Schema documents.
//!
//! ## Features
//!
//! - **Inheritance**: `inherits`, `heritable_properties` and `extends` are
//!   flattened into self-contained class definitions
//! - **Curies**: `*_curie` keys are expanded through the `namespaces` table
//! - **Imports**: classes from other source documents are referenced by
//!   `namespace:Name` and can be merged into a single document
//! - **Unions**: references to abstract classes become `oneOf` over their
//!   concrete descendants
//! - **Splitting**: one standalone document per public class, with a
//!   `checksums.sha256` manifest
//!
//! ## Pipeline
//!
//! ```text
//! source.yaml ──▶ raw ──▶ processed ──▶ output ──▶ json/<Class> ...
//!                  │
//!                  └─ imports (each compiled the same way)
//! ```

pub mod checksum;
pub mod classify;
pub mod cleanup;
pub mod config;
pub mod curie;
pub mod document;
pub mod emit;
pub mod error;
pub mod flatten;
pub mod graph;
pub mod markup;
pub mod merge;
pub mod split;

use std::path::Path;

pub use checksum::Checksum;
pub use classify::{ClassIndex, ClassInfo, ClassKind};
pub use config::{CompilerConfig, OutputFormat};
pub use curie::{CurieResolver, QualifiedName};
pub use document::{Dialect, ModeOverrides, SchemaDocument};
pub use emit::{render, write_artifacts, WriteReport};
pub use error::{Result, SchemaError};
pub use graph::InheritanceGraph;
pub use split::{split_document, ClassArtifact, Splitter};

/// Load `path` with the configured mode overrides, merging imports if asked
pub fn compile(path: impl AsRef<Path>, config: &CompilerConfig) -> Result<SchemaDocument> {
    let mut document = SchemaDocument::load_with(path, config.compile.overrides())?;
    if config.compile.merge_imports {
        document.merge_imports()?;
    }
    Ok(document)
}
