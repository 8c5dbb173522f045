//! CURIE Resolution
//!
//! Source documents abbreviate references as `namespace:identifier`. The
//! namespace table of the document maps each prefix to a base URI, and
//! expansion is plain concatenation of base and identifier.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Result, SchemaError};

fn curie_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][\w.-]*):([^\s:/][^\s:]*)$").unwrap())
}

/// Split a well-formed curie into `(namespace, identifier)`
pub fn split_curie(value: &str) -> Option<(&str, &str)> {
    let caps = curie_re().captures(value)?;
    let namespace = caps.get(1)?.as_str();
    let identifier = caps.get(2)?.as_str();
    Some((namespace, identifier))
}

/// Per-document namespace table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurieResolver {
    namespaces: IndexMap<String, String>,
}

impl CurieResolver {
    /// Build the resolver from a document's top-level `namespaces` map
    pub fn from_document(document: &Map<String, Value>) -> Result<Self> {
        let mut namespaces = IndexMap::new();
        if let Some(table) = document.get("namespaces") {
            let table = table.as_object().ok_or_else(|| {
                SchemaError::InvalidFormat("namespaces must be a mapping".to_string())
            })?;
            for (prefix, base) in table {
                let base = base.as_str().ok_or_else(|| {
                    SchemaError::InvalidFormat(format!("namespace '{}' must map to a string", prefix))
                })?;
                namespaces.insert(prefix.clone(), base.to_string());
            }
        }
        Ok(Self { namespaces })
    }

    /// Expand `namespace:identifier` to `base_uri + identifier`
    pub fn resolve(&self, curie: &str) -> Result<String> {
        let (namespace, identifier) =
            split_curie(curie).ok_or_else(|| SchemaError::InvalidCurie(curie.to_string()))?;
        let base = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| SchemaError::UnknownNamespace {
                namespace: namespace.to_string(),
                curie: curie.to_string(),
            })?;
        Ok(format!("{}{}", base, identifier))
    }

    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.namespaces.get(namespace).map(String::as_str)
    }

    pub fn namespaces(&self) -> &IndexMap<String, String> {
        &self.namespaces
    }
}

/// A class name as written in an `inherits` pointer
///
/// `Name` stays inside the current document, `ns:Name` is routed to the
/// document imported under `ns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualifiedName<'a> {
    Local(&'a str),
    Imported { namespace: &'a str, name: &'a str },
}

impl<'a> QualifiedName<'a> {
    pub fn parse(value: &'a str) -> Result<Self> {
        let mut parts = value.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) if !name.is_empty() => Ok(QualifiedName::Local(name)),
            (Some(namespace), Some(name), None) if !namespace.is_empty() && !name.is_empty() => {
                Ok(QualifiedName::Imported { namespace, name })
            }
            _ => Err(SchemaError::InvalidCurie(value.to_string())),
        }
    }

    /// The bare class name, without any namespace
    pub fn name(&self) -> &'a str {
        match self {
            QualifiedName::Local(name) => name,
            QualifiedName::Imported { name, .. } => name,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, QualifiedName::Local(_))
    }
}

impl fmt::Display for QualifiedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualifiedName::Local(name) => write!(f, "{}", name),
            QualifiedName::Imported { namespace, name } => write!(f, "{}:{}", namespace, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver() -> CurieResolver {
        let doc = json!({
            "namespaces": {
                "gks": "https://w3id.org/ga4gh/schema/gks/1.x/json/",
                "core": "core.json#/definitions/"
            }
        });
        CurieResolver::from_document(doc.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_resolve_curie() {
        let r = resolver();
        assert_eq!(
            r.resolve("gks:Coding").unwrap(),
            "https://w3id.org/ga4gh/schema/gks/1.x/json/Coding"
        );
        assert_eq!(r.resolve("core:Entity").unwrap(), "core.json#/definitions/Entity");
    }

    #[test]
    fn test_unknown_namespace() {
        let err = resolver().resolve("vrs:Allele").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownNamespace { .. }));
    }

    #[test]
    fn test_malformed_curie() {
        let r = resolver();
        assert!(matches!(r.resolve("Allele"), Err(SchemaError::InvalidCurie(_))));
        assert!(matches!(r.resolve("a:b:c"), Err(SchemaError::InvalidCurie(_))));
        assert_eq!(split_curie("https://example.org/x"), None);
        assert!(matches!(
            r.resolve("https://example.org/x"),
            Err(SchemaError::InvalidCurie(_))
        ));
        assert_eq!(split_curie("gks:Coding"), Some(("gks", "Coding")));
    }

    #[test]
    fn test_missing_namespace_table() {
        let doc = json!({"title": "x"});
        let r = CurieResolver::from_document(doc.as_object().unwrap()).unwrap();
        assert!(r.namespaces().is_empty());
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(QualifiedName::parse("Entity").unwrap(), QualifiedName::Local("Entity"));
        let q = QualifiedName::parse("core:Entity").unwrap();
        assert_eq!(q.name(), "Entity");
        assert!(!q.is_local());
        assert_eq!(q.to_string(), "core:Entity");
        assert!(QualifiedName::parse("a:b:c").is_err());
        assert!(QualifiedName::parse(":b").is_err());
    }
}
