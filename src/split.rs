//! Per-Class Splitting
//!
//! Turns one compiled document into one standalone document per
//! non-protected class. Each artifact is a copy of the document header with
//! the class definition lifted to the top level, the classes it protects
//! kept under the definitions keyword, and every `$ref` pointed at the
//! artifact that now holds the target class.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::config::OutputFormat;
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};

fn fragment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/(\$defs|definitions)/(\w+)").unwrap())
}

/// One per-class output document
#[derive(Debug, Clone, PartialEq)]
pub struct ClassArtifact {
    pub class_name: String,
    pub document: Map<String, Value>,
}

/// Splits a compiled root document into per-class artifacts
pub struct Splitter<'a> {
    root: &'a SchemaDocument,
    format: OutputFormat,
}

impl<'a> Splitter<'a> {
    pub fn new(root: &'a SchemaDocument, format: OutputFormat) -> Self {
        Self { root, format }
    }

    /// Build every artifact in memory; nothing is written here
    pub fn split(&self) -> Result<Vec<ClassArtifact>> {
        let keyword = self.root.keyword();
        let definitions =
            self.root
                .output_definitions()
                .ok_or_else(|| SchemaError::MissingDefinitions {
                    path: self.root.path().to_path_buf(),
                })?;

        let mut artifacts = Vec::new();
        for (class_name, class_def) in definitions {
            if self.root.classes.is_protected(class_name) {
                continue;
            }
            let mut document = self.root.output().clone();

            let mut members = Map::new();
            for member in self.root.classes.protected_members(class_name) {
                if let Some(member_def) = definitions.get(member) {
                    members.insert(member.to_string(), member_def.clone());
                }
            }
            if members.is_empty() {
                document.shift_remove(keyword);
            } else {
                let mut members = Value::Object(members);
                self.redirect(&mut members, class_name)?;
                document.insert(keyword.to_string(), members);
            }

            let mut class_def = class_def.clone();
            self.redirect(&mut class_def, class_name)?;
            if let Value::Object(class_def) = class_def {
                for (key, value) in class_def {
                    document.insert(key, value);
                }
            }
            document.insert("title".to_string(), Value::String(class_name.clone()));
            document.insert(
                "$id".to_string(),
                Value::String(self.root.class_uri(class_name, self.format)),
            );

            artifacts.push(ClassArtifact {
                class_name: class_name.clone(),
                document,
            });
        }
        Ok(artifacts)
    }

    /// Rewrite every `$ref` below `node` for the artifact of `dest_class`
    pub fn redirect(&self, node: &mut Value, dest_class: &str) -> Result<()> {
        match node {
            Value::Array(items) => {
                for item in items {
                    self.redirect(item, dest_class)?;
                }
            }
            Value::Object(map) => {
                for (key, value) in map.iter_mut() {
                    if key == "$ref" {
                        if let Value::String(reference) = value {
                            *reference = self.redirect_ref(reference, dest_class)?;
                        }
                    } else {
                        self.redirect(value, dest_class)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Target of one reference inside the artifact of `dest_class`
    ///
    /// Local refs to a class protected by `dest_class` stay fragment-only;
    /// local refs to a class protected by another owner point into that
    /// owner's artifact; everything else points at the class's own artifact.
    pub fn redirect_ref(&self, reference: &str, dest_class: &str) -> Result<String> {
        let mut parts = reference.split('#');
        let (location, fragment) = match (parts.next(), parts.next(), parts.next()) {
            (Some(location), None, None) => (location, ""),
            (Some(location), Some(fragment), None) => (location, fragment),
            _ => return Err(SchemaError::MalformedReference(reference.to_string())),
        };

        let class_name = if fragment.is_empty() {
            let last = location.rsplit('/').next().unwrap_or(location);
            last.split('.').next().unwrap_or(last)
        } else {
            fragment_re()
                .captures(fragment)
                .and_then(|caps| caps.get(2))
                .map(|m| m.as_str())
                .ok_or_else(|| SchemaError::MalformedReference(reference.to_string()))?
        };

        if location.is_empty() {
            if !self.root.classes.contains(class_name) {
                return Err(SchemaError::UnresolvedClass {
                    reference: reference.to_string(),
                });
            }
            if let Some(owner) = self.root.classes.protected_owner(class_name) {
                if owner == dest_class {
                    return Ok(format!("#{}", fragment));
                }
                return Ok(format!(
                    "{}#{}",
                    self.root.class_uri(owner, self.format),
                    fragment
                ));
            }
            return Ok(self.root.class_uri(class_name, self.format));
        }

        let owner_doc = self
            .root
            .imports()
            .values()
            .find_map(|import| import.find_defining_document(class_name))
            .ok_or_else(|| SchemaError::UnresolvedClass {
                reference: reference.to_string(),
            })?;
        Ok(owner_doc.class_uri(class_name, self.format))
    }
}

/// Split `root` into per-class artifacts
pub fn split_document(root: &SchemaDocument, format: OutputFormat) -> Result<Vec<ClassArtifact>> {
    Splitter::new(root, format).split()
}
