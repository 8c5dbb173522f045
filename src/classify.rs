//! Class Classification
//!
//! Every class definition is exactly one of abstract, primitive, or concrete
//! object. The kind is derived once from the *raw* definition and cached in a
//! [`ClassIndex`], so answers are identical before and after flattening.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// Kind of a class definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// No direct `properties` and no scalar type; a supertype or union root
    Abstract,
    /// Any `type` other than `object` (the implicit default is abstract)
    Primitive,
    /// `type: object` with direct `properties`
    ConcreteObject,
}

impl ClassKind {
    /// Classify a raw class definition
    pub fn of(definition: &Map<String, Value>) -> Self {
        let primitive = match definition.get("type") {
            None => false,
            Some(Value::String(ty)) => ty != "abstract" && ty != "object",
            Some(_) => true,
        };
        if primitive {
            ClassKind::Primitive
        } else if definition.contains_key("properties") {
            ClassKind::ConcreteObject
        } else {
            ClassKind::Abstract
        }
    }

    pub fn is_abstract(self) -> bool {
        self == ClassKind::Abstract
    }

    pub fn is_primitive(self) -> bool {
        self == ClassKind::Primitive
    }

    pub fn is_concrete(self) -> bool {
        self == ClassKind::ConcreteObject
    }

    /// Property and required keys this kind of class populates
    pub fn buckets(self) -> (&'static str, &'static str) {
        match self {
            ClassKind::Abstract => ("heritable_properties", "heritable_required"),
            _ => ("properties", "required"),
        }
    }
}

/// Cached facts about one class, taken from its raw definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub kind: ClassKind,
    pub inherits: Option<String>,
    pub protected_of: Option<String>,
    pub passthrough: bool,
}

impl ClassInfo {
    pub fn from_definition(name: &str, definition: &Map<String, Value>) -> Result<Self> {
        let kind = ClassKind::of(definition);
        let inherits = optional_str(name, definition, "inherits")?;
        let protected_of = optional_str(name, definition, "protectedClassOf")?;
        let passthrough = kind.is_abstract()
            && !definition.contains_key("properties")
            && !definition.contains_key("heritable_properties")
            && inherits.is_some();
        Ok(Self {
            kind,
            inherits,
            protected_of,
            passthrough,
        })
    }
}

fn optional_str(class: &str, definition: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match definition.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaError::InvalidFormat(format!(
            "{}.{} must be a string",
            class, key
        ))),
    }
}

/// Classification of every class in one document, in definition order
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    classes: IndexMap<String, ClassInfo>,
}

impl ClassIndex {
    pub fn build(definitions: &Map<String, Value>) -> Result<Self> {
        let mut classes = IndexMap::with_capacity(definitions.len());
        for (name, definition) in definitions {
            let definition = definition.as_object().ok_or_else(|| {
                SchemaError::InvalidFormat(format!("definition of {} must be a mapping", name))
            })?;
            classes.insert(name.clone(), ClassInfo::from_definition(name, definition)?);
        }
        Ok(Self { classes })
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn kind(&self, name: &str) -> Option<ClassKind> {
        self.classes.get(name).map(|info| info.kind)
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        self.kind(name).is_some_and(ClassKind::is_abstract)
    }

    pub fn is_primitive(&self, name: &str) -> bool {
        self.kind(name).is_some_and(ClassKind::is_primitive)
    }

    /// Abstract, declares no properties of its own, and inherits: an alias of its parent
    pub fn is_passthrough(&self, name: &str) -> bool {
        self.classes.get(name).is_some_and(|info| info.passthrough)
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_owner(name).is_some()
    }

    pub fn protected_owner(&self, name: &str) -> Option<&str> {
        self.classes.get(name)?.protected_of.as_deref()
    }

    /// Classes that name `owner` in `protectedClassOf`
    pub fn protected_members(&self, owner: &str) -> Vec<&str> {
        self.classes
            .iter()
            .filter(|(_, info)| info.protected_of.as_deref() == Some(owner))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> ClassIndex {
        let defs = json!({
            "Entity": {
                "heritable_properties": { "id": { "type": "string" } }
            },
            "Alias": { "inherits": "Entity" },
            "Residue": { "type": "string", "pattern": "^[A-Z]$" },
            "Range": { "type": ["integer", "null"] },
            "Allele": {
                "type": "object",
                "inherits": "Entity",
                "properties": { "state": { "type": "string" } }
            },
            "Location": {
                "type": "object",
                "protectedClassOf": "Allele",
                "properties": { "start": { "type": "integer" } }
            }
        });
        ClassIndex::build(defs.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_kinds() {
        let idx = index();
        assert_eq!(idx.kind("Entity"), Some(ClassKind::Abstract));
        assert_eq!(idx.kind("Alias"), Some(ClassKind::Abstract));
        assert_eq!(idx.kind("Residue"), Some(ClassKind::Primitive));
        assert_eq!(idx.kind("Range"), Some(ClassKind::Primitive));
        assert_eq!(idx.kind("Allele"), Some(ClassKind::ConcreteObject));
        assert_eq!(idx.kind("Missing"), None);
    }

    #[test]
    fn test_abstract_with_object_type_and_no_properties() {
        let def = json!({ "type": "object" });
        assert_eq!(ClassKind::of(def.as_object().unwrap()), ClassKind::Abstract);
    }

    #[test]
    fn test_passthrough() {
        let idx = index();
        assert!(idx.is_passthrough("Alias"));
        assert!(!idx.is_passthrough("Entity"));
        assert!(!idx.is_passthrough("Allele"));
    }

    #[test]
    fn test_protected() {
        let idx = index();
        assert!(idx.is_protected("Location"));
        assert_eq!(idx.protected_owner("Location"), Some("Allele"));
        assert!(!idx.is_protected("Allele"));
        assert_eq!(idx.protected_members("Allele"), vec!["Location"]);
        assert!(idx.protected_members("Entity").is_empty());
    }

    #[test]
    fn test_buckets() {
        assert_eq!(
            ClassKind::Abstract.buckets(),
            ("heritable_properties", "heritable_required")
        );
        assert_eq!(ClassKind::ConcreteObject.buckets(), ("properties", "required"));
    }

    #[test]
    fn test_non_mapping_definition_rejected() {
        let defs = json!({ "Bad": [1, 2] });
        assert!(ClassIndex::build(defs.as_object().unwrap()).is_err());
    }
}
