//! Output clean-up
//!
//! Derives the output tier from the processed tier: strips keys that only
//! matter to the compiler, scrubs description markup, concretizes references
//! to abstract classes, and drops abstract classes that are not unions.

use serde_json::{Map, Value};

use crate::document::SchemaDocument;
use crate::markup::scrub_markup;

/// Top-level keys consumed by the compiler
const COMPILER_KEYS: &[&str] = &["namespaces", "strict", "enforce_ordered", "imports"];

/// Class keys of abstract classes that have served their purpose once flattened
const ABSTRACT_KEYS: &[&str] = &["heritable_properties", "heritable_required", "header_level"];

pub(crate) fn clean_for_output(document: &SchemaDocument) -> Map<String, Value> {
    let mut output = document.processed.clone();
    for key in COMPILER_KEYS {
        output.shift_remove(*key);
    }

    let Some(Value::Object(definitions)) = output.get_mut(document.keyword()) else {
        return output;
    };

    let mut removals = Vec::new();
    for (name, definition) in definitions.iter_mut() {
        let Value::Object(definition) = definition else {
            continue;
        };
        definition.shift_remove("inherits");

        if document.classes.is_abstract(name) {
            for key in ABSTRACT_KEYS {
                definition.shift_remove(*key);
            }
            document.graph.concretize_object(definition);
            if !definition.contains_key("oneOf") {
                removals.push(name.clone());
            }
        }

        scrub_description(definition);
        if let Some(Value::Object(properties)) = definition.get_mut("properties") {
            for property in properties.values_mut() {
                if let Value::Object(property) = property {
                    scrub_description(property);
                    document.graph.concretize_object(property);
                }
            }
        }
    }

    for name in removals {
        tracing::debug!(class = %name, "dropping abstract class from output");
        definitions.shift_remove(&name);
    }
    output
}

fn scrub_description(object: &mut Map<String, Value>) {
    if let Some(Value::String(description)) = object.get_mut("description") {
        *description = scrub_markup(description);
    }
}
