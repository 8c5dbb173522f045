//! Class Flattening
//!
//! Merges every class's inherited and own properties into one
//! self-contained definition. Abstract classes collect into
//! `heritable_properties`/`heritable_required` for their descendants;
//! concrete classes into `properties`/`required`.
//!
//! Parents are flattened before children. A parent in another document is
//! read from that document's already-processed tier.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::curie::QualifiedName;
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};

/// Flatten every class of `document`, returning the processed tier and the
/// set of class names that were flattened
pub(crate) fn flatten_document(
    document: &SchemaDocument,
) -> Result<(Map<String, Value>, BTreeSet<String>)> {
    let mut processed = document.raw.clone();
    let Some(slot) = processed.get_mut(document.keyword()) else {
        return Ok((processed, BTreeSet::new()));
    };
    let Value::Object(definitions) = std::mem::take(slot) else {
        return Err(SchemaError::InvalidFormat(format!(
            "{} must be a mapping",
            document.keyword()
        )));
    };

    let mut processor = ClassProcessor::new(document, definitions);
    for name in document.classes.names() {
        processor.flatten(name)?;
    }
    let (definitions, done) = processor.finish();
    *slot = Value::Object(definitions);
    Ok((processed, done))
}

/// Memoized per-document flattening state
pub struct ClassProcessor<'a> {
    document: &'a SchemaDocument,
    definitions: Map<String, Value>,
    done: BTreeSet<String>,
}

impl<'a> ClassProcessor<'a> {
    pub fn new(document: &'a SchemaDocument, definitions: Map<String, Value>) -> Self {
        Self {
            document,
            definitions,
            done: BTreeSet::new(),
        }
    }

    pub fn finish(self) -> (Map<String, Value>, BTreeSet<String>) {
        (self.definitions, self.done)
    }

    pub fn is_flattened(&self, name: &str) -> bool {
        self.done.contains(name)
    }

    /// Flatten one class; repeated calls are no-ops
    pub fn flatten(&mut self, name: &str) -> Result<()> {
        if self.done.contains(name) {
            return Ok(());
        }
        let document = self.document;
        let info = document
            .classes
            .get(name)
            .ok_or_else(|| SchemaError::UnresolvedClass {
                reference: name.to_string(),
            })?;
        if info.kind.is_primitive() {
            self.done.insert(name.to_string());
            return Ok(());
        }

        let mut inherited = Map::new();
        let mut inherited_required = BTreeSet::new();
        if let Some(parent) = info.inherits.as_deref() {
            let parent_def = self.parent_definition(parent)?;
            inherited = parent_def
                .get("heritable_properties")
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| SchemaError::UnsupportedInheritance {
                    class: name.to_string(),
                    parent: parent.to_string(),
                })?;
            inherited_required = string_set(name, parent_def.get("heritable_required"))?;
        }

        let (prop_key, req_key) = info.kind.buckets();
        let class_def = self
            .definitions
            .get_mut(name)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                SchemaError::InvalidFormat(format!("definition of {} must be a mapping", name))
            })?;

        let mut own = match class_def.get(prop_key) {
            None => Map::new(),
            Some(Value::Object(props)) => props.clone(),
            Some(_) => {
                return Err(SchemaError::InvalidFormat(format!(
                    "{}.{} must be a mapping",
                    name, prop_key
                )))
            }
        };
        let mut own_required = string_set(name, class_def.get(req_key))?;

        for value in own.values_mut() {
            rewrite_property_tree(document, value)?;
        }

        let mut merged_own = Map::with_capacity(own.len());
        for (prop, attribs) in own {
            let Value::Object(attribs) = attribs else {
                merged_own.insert(prop, attribs);
                continue;
            };
            let effective = match attribs.get("extends") {
                Some(extends) => {
                    let extends = extends.as_str().ok_or_else(|| {
                        SchemaError::InvalidFormat(format!("{}.{}.extends must be a string", name, prop))
                    })?;
                    let base = inherited.shift_remove(extends).ok_or_else(|| {
                        SchemaError::ExtendsMissing {
                            class: name.to_string(),
                            property: prop.clone(),
                            extends: extends.to_string(),
                        }
                    })?;
                    if inherited_required.remove(extends) {
                        own_required.insert(prop.clone());
                    }
                    let base = match base {
                        Value::Object(base) => base,
                        _ => Map::new(),
                    };
                    extend_property(base, attribs)
                }
                None => attribs,
            };
            if document.enforce_ordered {
                check_ordered(name, &prop, &effective)?;
            }
            merged_own.insert(prop, Value::Object(effective));
        }

        if info.kind.is_abstract() {
            if class_def.contains_key("type") {
                return Err(SchemaError::AbstractWithType {
                    class: name.to_string(),
                });
            }
        } else {
            match class_def.get("type") {
                Some(Value::String(ty)) if ty == "object" => {}
                found => {
                    return Err(SchemaError::ConcreteNotObject {
                        class: name.to_string(),
                        found: found.map_or_else(|| "nothing".to_string(), Value::to_string),
                    })
                }
            }
        }

        // inherited first, own entries win on collision
        let mut properties = inherited;
        for (prop, attribs) in merged_own {
            properties.insert(prop, attribs);
        }
        let required: Vec<Value> = inherited_required
            .union(&own_required)
            .cloned()
            .map(Value::String)
            .collect();

        class_def.insert(prop_key.to_string(), Value::Object(properties));
        class_def.insert(req_key.to_string(), Value::Array(required));
        if document.strict && info.kind.is_concrete() {
            class_def.insert("additionalProperties".to_string(), Value::Bool(false));
        }

        tracing::debug!(class = name, kind = ?info.kind, "flattened class");
        self.done.insert(name.to_string());
        Ok(())
    }

    /// Processed definition of an `inherits` target, local or imported
    fn parent_definition(&mut self, parent: &str) -> Result<Map<String, Value>> {
        let unresolved = || SchemaError::UnresolvedClass {
            reference: parent.to_string(),
        };
        match QualifiedName::parse(parent)? {
            QualifiedName::Local(local) => {
                if !self.document.classes.contains(local) {
                    return Err(unresolved());
                }
                self.flatten(local)?;
                self.definitions
                    .get(local)
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or_else(unresolved)
            }
            QualifiedName::Imported { namespace, name } => self
                .document
                .import(namespace)
                .and_then(|import| import.processed_class(name))
                .cloned()
                .ok_or_else(unresolved),
        }
    }
}

/// Overlay an own property on the inherited property it `extends`
///
/// An own `$ref` drops inherited `oneOf`/`anyOf`, and an own `oneOf`/`anyOf`
/// drops an inherited `$ref`, so the result never carries both forms.
pub fn extend_property(mut base: Map<String, Value>, own: Map<String, Value>) -> Map<String, Value> {
    if own.contains_key("$ref") {
        base.shift_remove("oneOf");
        base.shift_remove("anyOf");
    }
    if own.contains_key("oneOf") || own.contains_key("anyOf") {
        base.shift_remove("$ref");
    }
    for (key, value) in own {
        base.insert(key, value);
    }
    base.shift_remove("extends");
    base
}

/// Arrays must say whether their order is meaningful
fn check_ordered(class: &str, property: &str, definition: &Map<String, Value>) -> Result<()> {
    if definition.get("type").and_then(Value::as_str) != Some("array") {
        return Ok(());
    }
    match definition.get("ordered") {
        Some(Value::Bool(_)) => Ok(()),
        None => Err(SchemaError::MissingOrdered {
            class: class.to_string(),
            property: property.to_string(),
        }),
        Some(_) => Err(SchemaError::InvalidOrdered {
            class: class.to_string(),
            property: property.to_string(),
        }),
    }
}

/// Resolve `*_curie` keys and qualify local refs of imported documents
///
/// `{"$ref_curie": "gks:Coding"}` becomes `{"$ref": "<gks base>Coding"}`,
/// appended after the remaining keys. In an imported document
/// `#/definitions/X` becomes `<stem>.json#/definitions/X` so it stays
/// resolvable once copied into the importer.
pub fn rewrite_property_tree(document: &SchemaDocument, node: &mut Value) -> Result<()> {
    match node {
        Value::Object(map) => {
            let entries = std::mem::take(map);
            let mut resolved = Vec::new();
            for (key, mut value) in entries {
                if let Some(base_key) = key.strip_suffix("_curie") {
                    let curie = value
                        .as_str()
                        .ok_or_else(|| SchemaError::InvalidCurie(value.to_string()))?;
                    let uri = document.resolver.resolve(curie)?;
                    resolved.push((base_key.to_string(), Value::String(uri)));
                    continue;
                }
                if key == "$ref" && document.imported {
                    if let Value::String(reference) = &mut value {
                        if reference.starts_with("#/") {
                            *reference = format!("{}{}", document.import_prefix(), reference);
                        }
                    }
                } else {
                    rewrite_property_tree(document, &mut value)?;
                }
                map.insert(key, value);
            }
            for (key, value) in resolved {
                map.insert(key, value);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_property_tree(document, item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn string_set(class: &str, value: Option<&Value>) -> Result<BTreeSet<String>> {
    let invalid = || SchemaError::InvalidFormat(format!("required list of {} must hold strings", class));
    match value {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}
