//! Schema Documents
//!
//! A [`SchemaDocument`] is one parsed source file together with every
//! document it imports. Loading runs the whole resolution pipeline once:
//!
//! ```text
//! raw ──▶ ClassIndex + InheritanceGraph ──▶ processed (flattened) ──▶ output (cleaned)
//! ```
//!
//! Each tier is its own deep copy; later tiers never alias earlier ones.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::{ClassIndex, ClassInfo, ClassKind};
use crate::cleanup::clean_for_output;
use crate::config::OutputFormat;
use crate::curie::{CurieResolver, QualifiedName};
use crate::error::{Result, SchemaError};
use crate::flatten::flatten_document;
use crate::graph::InheritanceGraph;

/// Draft-07 dialect URI
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema";
/// 2020-12 dialect URI
pub const DRAFT_2020_12: &str = "http://json-schema.org/draft/2020-12/schema";

/// Supported JSON Schema dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Draft07,
    Draft202012,
}

impl Dialect {
    /// Determine the dialect from a `$schema` value
    pub fn from_schema_uri(uri: &str) -> Option<Self> {
        match uri.strip_suffix('#').unwrap_or(uri) {
            DRAFT_07 => Some(Dialect::Draft07),
            DRAFT_2020_12 => Some(Dialect::Draft202012),
            _ => None,
        }
    }

    /// Key under which class definitions live
    pub fn definitions_keyword(&self) -> &'static str {
        match self {
            Dialect::Draft07 => "definitions",
            Dialect::Draft202012 => "$defs",
        }
    }
}

/// Caller overrides for the document-level mode flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeOverrides {
    pub strict: Option<bool>,
    pub enforce_ordered: Option<bool>,
}

/// One loaded source document and its imports
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub(crate) path: PathBuf,
    pub(crate) imported: bool,
    pub(crate) dialect: Dialect,
    pub(crate) strict: bool,
    pub(crate) enforce_ordered: bool,
    pub(crate) raw: Map<String, Value>,
    pub(crate) imports: IndexMap<String, SchemaDocument>,
    pub(crate) resolver: CurieResolver,
    pub(crate) classes: ClassIndex,
    pub(crate) graph: InheritanceGraph,
    pub(crate) processed: Map<String, Value>,
    pub(crate) processed_classes: BTreeSet<String>,
    pub(crate) output: Map<String, Value>,
}

impl SchemaDocument {
    /// Load a document (YAML or JSON) and everything it imports
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, ModeOverrides::default())
    }

    /// Load a document, overriding its `strict`/`enforce_ordered` flags
    pub fn load_with(path: impl AsRef<Path>, overrides: ModeOverrides) -> Result<Self> {
        let mut chain = Vec::new();
        Self::load_inner(path.as_ref(), false, overrides, &mut chain)
    }

    /// Build a document from an already-parsed value
    ///
    /// `path` locates the document for relative imports and output naming;
    /// it does not need to exist unless the value declares imports.
    pub fn from_value(value: Value, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut chain = vec![canonical(&path)];
        Self::from_parts(value, path, false, ModeOverrides::default(), &mut chain)
    }

    fn load_inner(
        path: &Path,
        imported: bool,
        overrides: ModeOverrides,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Self> {
        let key = canonical(path);
        if chain.contains(&key) {
            return Err(SchemaError::CyclicImport {
                path: path.to_path_buf(),
            });
        }
        chain.push(key);

        let content = fs::read_to_string(path)?;
        let value: Value = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        tracing::debug!(path = %path.display(), imported, "loaded schema document");

        let document = Self::from_parts(value, path.to_path_buf(), imported, overrides, chain)?;
        chain.pop();
        Ok(document)
    }

    fn from_parts(
        value: Value,
        path: PathBuf,
        imported: bool,
        overrides: ModeOverrides,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Self> {
        let Value::Object(raw) = value else {
            return Err(SchemaError::InvalidFormat(format!(
                "{} is not a mapping",
                path.display()
            )));
        };

        let schema_uri = raw.get("$schema").and_then(Value::as_str).unwrap_or_default();
        let dialect =
            Dialect::from_schema_uri(schema_uri).ok_or_else(|| SchemaError::UnsupportedDialect {
                path: path.clone(),
                schema: schema_uri.to_string(),
            })?;

        let imports = Self::load_imports(&raw, &path, chain)?;

        let strict = overrides
            .strict
            .or_else(|| raw.get("strict").and_then(Value::as_bool))
            .unwrap_or(false);
        let enforce_ordered = overrides
            .enforce_ordered
            .or_else(|| raw.get("enforce_ordered").and_then(Value::as_bool))
            .unwrap_or(strict);

        let mut document = Self {
            path,
            imported,
            dialect,
            strict,
            enforce_ordered,
            raw,
            imports,
            resolver: CurieResolver::default(),
            classes: ClassIndex::default(),
            graph: InheritanceGraph::default(),
            processed: Map::new(),
            processed_classes: BTreeSet::new(),
            output: Map::new(),
        };
        document.init_from_raw()?;
        Ok(document)
    }

    fn load_imports(
        raw: &Map<String, Value>,
        path: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<IndexMap<String, SchemaDocument>> {
        let mut imports = IndexMap::new();
        let Some(table) = raw.get("imports") else {
            return Ok(imports);
        };
        let table = table
            .as_object()
            .ok_or_else(|| SchemaError::InvalidFormat("imports must be a mapping".to_string()))?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        for (namespace, location) in table {
            let location = location.as_str().ok_or_else(|| {
                SchemaError::InvalidFormat(format!("import '{}' must be a path", namespace))
            })?;
            let mut import_path = PathBuf::from(location);
            if !import_path.is_absolute() {
                import_path = base_dir.join(import_path);
            }
            let imported = Self::load_inner(&import_path, true, ModeOverrides::default(), chain)?;
            imports.insert(namespace.clone(), imported);
        }
        Ok(imports)
    }

    /// Rebuild every derived tier from `raw`
    pub(crate) fn init_from_raw(&mut self) -> Result<()> {
        let resolver = CurieResolver::from_document(&self.raw)?;
        let empty = Map::new();
        let definitions = self.raw_definitions().unwrap_or(&empty);
        let classes = ClassIndex::build(definitions)?;
        let graph = InheritanceGraph::build(self.keyword(), definitions, &classes)?;
        self.resolver = resolver;
        self.classes = classes;
        self.graph = graph;

        let (processed, processed_classes) = flatten_document(self)?;
        self.processed = processed;
        self.processed_classes = processed_classes;
        self.output = clean_for_output(self);
        tracing::debug!(
            path = %self.path.display(),
            classes = self.processed_classes.len(),
            edges = self.graph.edge_count(),
            "document resolved"
        );
        Ok(())
    }

    // ========== Accessors ==========

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_imported(&self) -> bool {
        self.imported
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// `definitions` or `$defs`, depending on the dialect
    pub fn keyword(&self) -> &'static str {
        self.dialect.definitions_keyword()
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn enforce_ordered(&self) -> bool {
        self.enforce_ordered
    }

    pub fn title(&self) -> Option<&str> {
        self.raw.get("title").and_then(Value::as_str)
    }

    pub fn imports(&self) -> &IndexMap<String, SchemaDocument> {
        &self.imports
    }

    pub fn import(&self, namespace: &str) -> Option<&SchemaDocument> {
        self.imports.get(namespace)
    }

    pub fn resolver(&self) -> &CurieResolver {
        &self.resolver
    }

    pub fn classes(&self) -> &ClassIndex {
        &self.classes
    }

    pub fn graph(&self) -> &InheritanceGraph {
        &self.graph
    }

    pub fn processed_classes(&self) -> &BTreeSet<String> {
        &self.processed_classes
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn processed(&self) -> &Map<String, Value> {
        &self.processed
    }

    /// The cleaned document handed to emitters
    pub fn output(&self) -> &Map<String, Value> {
        &self.output
    }

    pub fn raw_definitions(&self) -> Option<&Map<String, Value>> {
        self.raw.get(self.keyword()).and_then(Value::as_object)
    }

    pub fn processed_definitions(&self) -> Option<&Map<String, Value>> {
        self.processed.get(self.keyword()).and_then(Value::as_object)
    }

    pub fn output_definitions(&self) -> Option<&Map<String, Value>> {
        self.output.get(self.keyword()).and_then(Value::as_object)
    }

    pub fn raw_class(&self, name: &str) -> Option<&Map<String, Value>> {
        self.raw_definitions()?.get(name)?.as_object()
    }

    pub fn processed_class(&self, name: &str) -> Option<&Map<String, Value>> {
        self.processed_definitions()?.get(name)?.as_object()
    }

    pub fn output_class(&self, name: &str) -> Option<&Map<String, Value>> {
        self.output_definitions()?.get(name)?.as_object()
    }

    // ========== Qualified-name resolution ==========

    /// Route `Name` or `ns:Name` to the document that defines it
    pub fn resolve_class<'a>(&'a self, reference: &'a str) -> Result<(&'a SchemaDocument, &'a str)> {
        let unresolved = || SchemaError::UnresolvedClass {
            reference: reference.to_string(),
        };
        let (document, name) = match QualifiedName::parse(reference)? {
            QualifiedName::Local(name) => (self, name),
            QualifiedName::Imported { namespace, name } => {
                (self.imports.get(namespace).ok_or_else(unresolved)?, name)
            }
        };
        if !document.classes.contains(name) {
            return Err(unresolved());
        }
        Ok((document, name))
    }

    pub fn class_info<'a>(&'a self, reference: &'a str) -> Result<&'a ClassInfo> {
        let (document, name) = self.resolve_class(reference)?;
        document.classes.get(name).ok_or_else(|| SchemaError::UnresolvedClass {
            reference: reference.to_string(),
        })
    }

    pub fn class_kind(&self, reference: &str) -> Result<ClassKind> {
        Ok(self.class_info(reference)?.kind)
    }

    pub fn is_abstract(&self, reference: &str) -> Result<bool> {
        Ok(self.class_kind(reference)?.is_abstract())
    }

    pub fn is_primitive(&self, reference: &str) -> Result<bool> {
        Ok(self.class_kind(reference)?.is_primitive())
    }

    pub fn is_passthrough(&self, reference: &str) -> Result<bool> {
        Ok(self.class_info(reference)?.passthrough)
    }

    pub fn is_protected(&self, reference: &str) -> Result<bool> {
        Ok(self.class_info(reference)?.protected_of.is_some())
    }

    /// Find the document (this one or any transitive import) whose
    /// processed definitions contain `name`
    pub fn find_defining_document(&self, name: &str) -> Option<&SchemaDocument> {
        if self.processed_definitions().is_some_and(|defs| defs.contains_key(name)) {
            return Some(self);
        }
        self.imports
            .values()
            .find_map(|import| import.find_defining_document(name))
    }

    // ========== Naming ==========

    /// Local pointer to a class: `#/<keyword>/<name>`
    pub fn class_url(&self, name: &str) -> String {
        format!("#/{}/{}", self.keyword(), name)
    }

    /// File prefix used when an imported document's local refs are qualified
    ///
    /// `core-source.yaml` becomes `core.json`.
    pub fn import_prefix(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let stem = stem.split('-').next().unwrap_or(stem);
        format!("{}.json", stem)
    }

    /// Absolute identifier of the per-class artifact for `name`
    ///
    /// Derived from the document `$id` with its last path segment replaced by
    /// `<format>/<name>`. Documents without an `$id` address siblings by name.
    pub fn class_uri(&self, name: &str, format: OutputFormat) -> String {
        match self.raw.get("$id").and_then(Value::as_str) {
            Some(id) => {
                let base = id.rsplit_once('/').map(|(base, _)| base).unwrap_or(id);
                format!("{}/{}/{}", base, format.dir_name(), name)
            }
            None => name.to_string(),
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
