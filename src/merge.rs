//! Import Merging
//!
//! Folds every imported document into the root so the result is a single
//! self-contained document with no imports. Import namespaces are repointed
//! at the root's own definitions, curie `inherits` become local names, and
//! the whole pipeline is rerun over the merged definitions.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::classify::ClassIndex;
use crate::curie::{split_curie, CurieResolver};
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};
use crate::graph::InheritanceGraph;

fn local_defs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#/(\$defs|definitions)/").unwrap())
}

/// What the merge needs from one imported document
struct MergedImport {
    namespace: String,
    definitions: Map<String, Value>,
    namespaces: CurieResolver,
}

impl SchemaDocument {
    /// Merge all (transitively) imported definitions into this document
    pub fn merge_imports(&mut self) -> Result<()> {
        let mut order: Vec<(String, &SchemaDocument)> = Vec::new();
        register_imports(self, &mut order)?;

        let mut defined: BTreeSet<String> = self.processed_classes.clone();
        for (namespace, import) in &order {
            for class in &import.processed_classes {
                if !defined.insert(class.clone()) {
                    return Err(SchemaError::ClassCollision {
                        class: class.clone(),
                        namespace: namespace.clone(),
                    });
                }
            }
        }

        let merged: Vec<MergedImport> = order
            .iter()
            .map(|(namespace, import)| MergedImport {
                namespace: namespace.clone(),
                definitions: import.raw_definitions().cloned().unwrap_or_default(),
                namespaces: import.resolver.clone(),
            })
            .collect();
        let import_names: BTreeSet<&str> = merged.iter().map(|m| m.namespace.as_str()).collect();

        let keyword = self.keyword();
        let local_base = format!("#/{}/", keyword);
        let mut namespaces: IndexMap<String, String> = self.resolver.namespaces().clone();
        for import in &merged {
            namespaces.insert(import.namespace.clone(), local_base.clone());
            for (prefix, base) in import.namespaces.namespaces() {
                if import_names.contains(prefix.as_str()) {
                    continue;
                }
                match namespaces.get(prefix) {
                    Some(existing) if existing != base => {
                        tracing::warn!(
                            namespace = %prefix,
                            kept = %existing,
                            ignored = %base,
                            "external namespace declared differently by import"
                        );
                    }
                    Some(_) => {}
                    None => {
                        namespaces.insert(prefix.clone(), base.clone());
                    }
                }
            }
        }
        let namespaces: Map<String, Value> = namespaces
            .into_iter()
            .map(|(prefix, base)| (prefix, Value::String(base)))
            .collect();

        // staged on a copy; `self` only changes once the rebuild succeeds
        let mut raw = self.raw.clone();
        raw.insert("namespaces".to_string(), Value::Object(namespaces));

        let definitions = match raw
            .entry(keyword)
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(definitions) => definitions,
            _ => {
                return Err(SchemaError::InvalidFormat(format!(
                    "{} must be a mapping",
                    keyword
                )))
            }
        };
        for import in merged {
            tracing::debug!(namespace = %import.namespace, classes = import.definitions.len(), "merging import");
            definitions.extend(import.definitions);
        }

        for class in &defined {
            let Some(Value::Object(definition)) = definitions.get_mut(class) else {
                continue;
            };
            let local_parent = definition
                .get("inherits")
                .and_then(Value::as_str)
                .and_then(split_curie)
                .map(|(_, name)| name.to_string());
            if let Some(parent) = local_parent {
                definition.insert("inherits".to_string(), Value::String(parent));
            }
            localize_refs(class, keyword, definition)?;
        }

        raw.shift_remove("imports");
        let title = format!("{}-Merged-Imports", self.title().unwrap_or_default());
        raw.insert("title".to_string(), Value::String(title));

        let mut merged = SchemaDocument {
            path: self.path.clone(),
            imported: self.imported,
            dialect: self.dialect,
            strict: self.strict,
            enforce_ordered: self.enforce_ordered,
            raw,
            imports: IndexMap::new(),
            resolver: CurieResolver::default(),
            classes: ClassIndex::default(),
            graph: InheritanceGraph::default(),
            processed: Map::new(),
            processed_classes: BTreeSet::new(),
            output: Map::new(),
        };
        merged.init_from_raw()?;
        *self = merged;
        Ok(())
    }
}

/// Depth-first post-order over the import tree, one entry per namespace
fn register_imports<'a>(
    document: &'a SchemaDocument,
    order: &mut Vec<(String, &'a SchemaDocument)>,
) -> Result<()> {
    for (namespace, import) in &document.imports {
        register_imports(import, order)?;
        match order.iter().find(|(seen, _)| seen == namespace) {
            Some((_, seen)) => {
                if source_key(seen) != source_key(import) {
                    return Err(SchemaError::ImportConflict {
                        namespace: namespace.clone(),
                    });
                }
            }
            None => order.push((namespace.clone(), import)),
        }
    }
    Ok(())
}

fn source_key(document: &SchemaDocument) -> PathBuf {
    fs::canonicalize(document.path()).unwrap_or_else(|_| document.path().to_path_buf())
}

/// Every `$ref` must be a local definitions pointer; normalise its keyword
fn localize_refs(class: &str, keyword: &str, node: &mut Map<String, Value>) -> Result<()> {
    for (key, value) in node.iter_mut() {
        match value {
            Value::String(reference) if key == "$ref" => {
                let normalised = match local_defs_re().captures(reference) {
                    Some(caps) if &caps[1] != keyword => {
                        Some(format!("#/{}/{}", keyword, &reference[caps[0].len()..]))
                    }
                    Some(_) => None,
                    None => {
                        return Err(SchemaError::NonLocalReference {
                            class: class.to_string(),
                            reference: reference.clone(),
                        })
                    }
                };
                if let Some(normalised) = normalised {
                    *reference = normalised;
                }
            }
            Value::Object(child) => localize_refs(class, keyword, child)?,
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(child) = item {
                        localize_refs(class, keyword, child)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}
