//! End-to-end tests over the source documents in tests/fixtures
//!
//! Each test loads a fixture through the public API and checks the compiled,
//! merged or split result.

use std::fs;
use std::path::PathBuf;

use metaschema::config::CompileConfig;
use metaschema::emit::CHECKSUM_FILE;
use metaschema::{
    compile, split_document, write_artifacts, ClassKind, CompilerConfig, OutputFormat,
    SchemaDocument, SchemaError,
};
use serde_json::json;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn merged_config() -> CompilerConfig {
    CompilerConfig {
        compile: CompileConfig {
            merge_imports: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

// ========== Loading and flattening ==========

#[test]
fn test_imports_are_loaded_and_flagged() {
    let doc = SchemaDocument::load(fixture("vrs-source.yaml")).unwrap();
    assert!(!doc.is_imported());
    let core = doc.import("gks").unwrap();
    assert!(core.is_imported());
    assert_eq!(doc.class_kind("gks:Entity").unwrap(), ClassKind::Abstract);
    assert_eq!(doc.class_kind("gks:Coding").unwrap(), ClassKind::ConcreteObject);
    assert_eq!(doc.class_kind("Residue").unwrap(), ClassKind::Primitive);
}

#[test]
fn test_cross_document_inheritance() {
    let doc = SchemaDocument::load(fixture("vrs-source.yaml")).unwrap();
    let allele = doc.processed_class("Allele").unwrap();

    let keys: Vec<&String> = allele["properties"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["id", "label", "extensions", "location", "state", "coding"]);
    assert_eq!(allele["required"], json!(["id", "location"]));
    assert_eq!(allele["additionalProperties"], json!(false));
    assert_eq!(
        allele["properties"]["extensions"]["items"]["$ref"],
        json!("core.json#/definitions/Extension")
    );
    assert_eq!(
        allele["properties"]["coding"]["$ref"],
        json!("https://example.org/schema/core/1.x/json/Coding")
    );
}

#[test]
fn test_output_tier_cleaned() {
    let doc = SchemaDocument::load(fixture("vrs-source.yaml")).unwrap();
    let output = doc.output();
    assert!(!output.contains_key("imports"));
    assert!(!output.contains_key("namespaces"));
    assert!(!output.contains_key("strict"));

    let variation = doc.output_class("Variation").unwrap();
    assert_eq!(variation["description"], json!("Either an Allele or a Haplotype."));
    assert!(!doc.output_class("Allele").unwrap().contains_key("inherits"));

    let core = doc.import("gks").unwrap();
    assert!(core.output_class("Entity").is_none());
    assert_eq!(
        core.output_class("Extension").unwrap()["description"],
        json!("A free-form [name/value](https://example.org/ext) pair.")
    );
}

#[test]
fn test_json_source_with_2020_12_dialect() {
    let doc = SchemaDocument::load(fixture("shapes-source.json")).unwrap();
    assert_eq!(doc.keyword(), "$defs");
    let drawing = doc.output_class("Drawing").unwrap();
    assert_eq!(
        drawing["properties"]["shape"],
        json!({
            "oneOf": [
                { "$ref": "#/$defs/Circle" },
                { "$ref": "#/$defs/Square" }
            ]
        })
    );
    assert!(doc.output_class("Shape").is_none());
}

// ========== Failures ==========

#[test]
fn test_missing_ordered_writes_nothing() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("json");
    let mut config = CompilerConfig::default();
    config.output.directory = Some(out.clone());

    let err = compile(fixture("unordered-source.yaml"), &config).unwrap_err();
    assert!(matches!(err, SchemaError::MissingOrdered { ref property, .. } if property == "genes"));
    assert!(!out.exists());
}

#[test]
fn test_ordered_override_relaxes_check() {
    let mut config = CompilerConfig::default();
    config.compile.enforce_ordered = Some(false);
    let doc = compile(fixture("unordered-source.yaml"), &config).unwrap();
    assert!(doc.strict());
    assert!(!doc.enforce_ordered());
}

#[test]
fn test_cyclic_import_rejected() {
    let err = SchemaDocument::load(fixture("cycle-a-source.yaml")).unwrap_err();
    assert!(matches!(err, SchemaError::CyclicImport { .. }));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = SchemaDocument::load(fixture("nope-source.yaml")).unwrap_err();
    assert!(matches!(err, SchemaError::Io(_)));
}

// ========== Merging ==========

#[test]
fn test_merge_imports() {
    let doc = compile(fixture("vrs-source.yaml"), &merged_config()).unwrap();
    assert!(doc.imports().is_empty());
    assert_eq!(doc.title(), Some("vrs-Merged-Imports"));
    assert!(!doc.raw().contains_key("imports"));

    assert_eq!(doc.resolver().get("gks"), Some("#/definitions/"));
    assert_eq!(
        doc.resolver().get("core"),
        Some("https://example.org/schema/core/1.x/json/")
    );

    assert_eq!(doc.raw_class("Allele").unwrap()["inherits"], json!("Entity"));
    let allele = doc.processed_class("Allele").unwrap();
    assert_eq!(allele["properties"]["coding"]["$ref"], json!("#/definitions/Coding"));
    assert_eq!(
        allele["properties"]["extensions"]["items"]["$ref"],
        json!("#/definitions/Extension")
    );

    let classes: Vec<&String> = doc.output_definitions().unwrap().keys().collect();
    assert_eq!(
        classes,
        vec!["Variation", "Allele", "SequenceLocation", "Haplotype", "Residue", "Extension", "Coding"]
    );
}

#[test]
fn test_merge_rejects_class_defined_twice() {
    let err = compile(fixture("collision-source.yaml"), &merged_config()).unwrap_err();
    match err {
        SchemaError::ClassCollision { class, namespace } => {
            assert_eq!(class, "Allele");
            assert_eq!(namespace, "dup");
        }
        other => panic!("Expected ClassCollision, got {:?}", other),
    }
}

#[test]
fn test_merge_rejects_namespace_bound_to_two_files() {
    let doc = SchemaDocument::load(fixture("conflict-source.yaml")).unwrap();
    assert_eq!(doc.imports().len(), 2);

    let err = compile(fixture("conflict-source.yaml"), &merged_config()).unwrap_err();
    assert!(matches!(err, SchemaError::ImportConflict { ref namespace } if namespace == "shared"));
}

#[test]
fn test_merge_rejects_external_reference() {
    let err = compile(fixture("external-ref-source.yaml"), &merged_config()).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::NonLocalReference { ref class, .. } if class == "Annotation"
    ));
}

#[test]
fn test_failed_merge_leaves_document_intact() {
    let mut doc = SchemaDocument::load(fixture("strict-root-source.yaml")).unwrap();
    let output = doc.output().clone();

    let err = doc.merge_imports().unwrap_err();
    assert!(matches!(err, SchemaError::MissingOrdered { ref class, .. } if class == "Tag"));

    assert_eq!(doc.title(), Some("strict-root"));
    assert!(doc.import("loose").is_some());
    assert!(doc.raw().contains_key("imports"));
    assert!(doc.raw_class("Tag").is_none());
    assert_eq!(doc.resolver().get("loose"), None);
    assert_eq!(doc.output(), &output);
    assert!(doc.processed_class("Panel").is_some());
}

// ========== Splitting ==========

#[test]
fn test_split_redirects_references() {
    let doc = SchemaDocument::load(fixture("vrs-source.yaml")).unwrap();
    let artifacts = split_document(&doc, OutputFormat::Json).unwrap();
    let names: Vec<&str> = artifacts.iter().map(|a| a.class_name.as_str()).collect();
    assert_eq!(names, vec!["Variation", "Allele", "Haplotype", "Residue"]);

    let allele = &artifacts[1].document;
    assert_eq!(allele["$id"], json!("https://example.org/schema/vrs/2.x/json/Allele"));
    assert_eq!(allele["title"], json!("Allele"));
    assert_eq!(
        allele["properties"]["location"]["$ref"],
        json!("#/definitions/SequenceLocation")
    );
    assert_eq!(
        allele["properties"]["extensions"]["items"]["$ref"],
        json!("https://example.org/schema/core/1.x/json/Extension")
    );
    assert_eq!(
        allele["properties"]["coding"]["$ref"],
        json!("https://example.org/schema/core/1.x/json/Coding")
    );
    assert!(allele["definitions"]["SequenceLocation"].is_object());

    let haplotype = &artifacts[2].document;
    assert!(!haplotype.contains_key("definitions"));
    assert_eq!(
        haplotype["properties"]["members"]["items"]["$ref"],
        json!("https://example.org/schema/vrs/2.x/json/Allele")
    );

    let residue = &artifacts[3].document;
    assert_eq!(residue["type"], json!("string"));
    assert_eq!(residue["pattern"], json!("^[A-Z*\\-]$"));
}

#[test]
fn test_split_merged_document() {
    let doc = compile(fixture("vrs-source.yaml"), &merged_config()).unwrap();
    let artifacts = split_document(&doc, OutputFormat::Yaml).unwrap();
    let coding = artifacts.iter().find(|a| a.class_name == "Coding").unwrap();
    assert_eq!(
        coding.document["$id"],
        json!("https://example.org/schema/vrs/2.x/yaml/Coding")
    );
    let allele = artifacts.iter().find(|a| a.class_name == "Allele").unwrap();
    assert_eq!(
        allele.document["properties"]["coding"]["$ref"],
        json!("https://example.org/schema/vrs/2.x/yaml/Coding")
    );
}

#[test]
fn test_split_output_is_deterministic() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    for dir in [first.path(), second.path()] {
        let doc = SchemaDocument::load(fixture("vrs-source.yaml")).unwrap();
        let artifacts = split_document(&doc, OutputFormat::Json).unwrap();
        write_artifacts(&artifacts, dir, OutputFormat::Json, 3, true).unwrap();
    }

    let manifest = fs::read_to_string(first.path().join(CHECKSUM_FILE)).unwrap();
    assert_eq!(manifest, fs::read_to_string(second.path().join(CHECKSUM_FILE)).unwrap());
    let files: Vec<&str> = manifest.lines().map(|l| l.split_once("  ").unwrap().1).collect();
    assert_eq!(files, vec!["Allele", "Haplotype", "Residue", "Variation"]);

    let allele = fs::read_to_string(first.path().join("Allele")).unwrap();
    assert!(allele.starts_with("{\n   \"$schema\""));
}
