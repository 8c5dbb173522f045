//! Inheritance/Union Graph
//!
//! Maps each class pointer (`#/<keyword>/<Class>`) to the pointers that
//! directly specialise it, either by `inherits` or as a member of an abstract
//! `oneOf`. Only local pointers are tracked; cross-document inheritance is
//! resolved during flattening instead.
//!
//! The graph also drives concretization: a reference to an abstract class is
//! replaced by the sorted union of its leaf descendants.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

use crate::classify::ClassIndex;
use crate::curie::QualifiedName;
use crate::error::{Result, SchemaError};

/// Why a child is recorded under a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Child declares `inherits: Parent`
    Inherits,
    /// Child is a `$ref` member of the parent's `oneOf`
    OneOf,
}

/// Parent → child graph over class pointers
#[derive(Debug, Clone, Default)]
pub struct InheritanceGraph {
    graph: DiGraph<String, EdgeKind>,
    node_indices: HashMap<String, NodeIndex>,
}

impl InheritanceGraph {
    /// Scan a definitions map and record every local specialisation
    ///
    /// Fails with [`SchemaError::CyclicDefinition`] when the recorded edges
    /// form a cycle, since concretization could never terminate.
    pub fn build(
        keyword: &str,
        definitions: &Map<String, Value>,
        classes: &ClassIndex,
    ) -> Result<Self> {
        let mut graph = Self::default();

        for (name, definition) in definitions {
            let class_url = format!("#/{}/{}", keyword, name);

            if classes.is_abstract(name) {
                if let Some(Value::Array(members)) = definition.get("oneOf") {
                    for member in members {
                        let Value::Object(member) = member else {
                            continue;
                        };
                        if member.len() != 1 {
                            return Err(SchemaError::InvalidUnionMember {
                                class: name.clone(),
                            });
                        }
                        // curie and external members are leaves of other documents
                        match member.get("$ref").and_then(Value::as_str) {
                            Some(target) if target.starts_with("#/") => {
                                graph.add_child(&class_url, target, EdgeKind::OneOf);
                            }
                            _ => {}
                        }
                    }
                }
            }

            if let Some(info) = classes.get(name) {
                if let Some(parent) = info.inherits.as_deref() {
                    if QualifiedName::parse(parent)?.is_local() {
                        let parent_url = format!("#/{}/{}", keyword, parent);
                        graph.add_child(&parent_url, &class_url, EdgeKind::Inherits);
                    }
                }
            }
        }

        graph.check_acyclic()?;
        Ok(graph)
    }

    fn node(&mut self, url: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(url) {
            return idx;
        }
        let idx = self.graph.add_node(url.to_string());
        self.node_indices.insert(url.to_string(), idx);
        idx
    }

    fn add_child(&mut self, parent: &str, child: &str, kind: EdgeKind) {
        let from = self.node(parent);
        let to = self.node(child);
        self.graph.add_edge(from, to, kind);
    }

    fn check_acyclic(&self) -> Result<()> {
        for scc in kosaraju_scc(&self.graph) {
            let cyclic = scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]);
            if cyclic {
                let mut members: Vec<String> = scc
                    .into_iter()
                    .map(|idx| self.graph[idx].clone())
                    .collect();
                members.sort();
                return Err(SchemaError::CyclicDefinition { members });
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct children of a class pointer, sorted
    pub fn children(&self, url: &str) -> BTreeSet<&str> {
        let Some(&idx) = self.node_indices.get(url) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|child| self.graph[child].as_str())
            .collect()
    }

    pub fn has_children(&self, url: &str) -> bool {
        self.node_indices.get(url).is_some_and(|&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Outgoing)
                .next()
                .is_some()
        })
    }

    /// Leaf descendants of `url`, or `{url}` when it has no recorded children
    pub fn concretize(&self, url: &str) -> BTreeSet<String> {
        let mut leaves = BTreeSet::new();
        self.collect_leaves(url, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, url: &str, leaves: &mut BTreeSet<String>) {
        let children = self.children(url);
        if children.is_empty() {
            leaves.insert(url.to_string());
            return;
        }
        for child in children {
            self.collect_leaves(child, leaves);
        }
    }

    /// Rewrite the references held by one schema object in place
    ///
    /// A bare `$ref` to an abstract class becomes a `oneOf` of its leaves;
    /// every `$ref` member of an existing `oneOf` is expanded the same way;
    /// arrays are handled through their `items`.
    pub fn concretize_object(&self, object: &mut Map<String, Value>) {
        if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
            let reference = reference.to_string();
            let leaves = self.concretize(&reference);
            if leaves.len() == 1 && leaves.contains(&reference) {
                return;
            }
            tracing::debug!(%reference, leaves = leaves.len(), "concretized reference");
            object.shift_remove("$ref");
            object.insert("oneOf".to_string(), Value::Array(ref_list(leaves)));
        } else if let Some(Value::Array(members)) = object.get("oneOf") {
            let mut leaves = BTreeSet::new();
            let mut inline = Vec::new();
            for member in members {
                match member.get("$ref").and_then(Value::as_str) {
                    Some(reference) => leaves.extend(self.concretize(reference)),
                    None => inline.push(member.clone()),
                }
            }
            let mut union = ref_list(leaves);
            union.extend(inline);
            object.insert("oneOf".to_string(), Value::Array(union));
        } else if object.get("type").and_then(Value::as_str) == Some("array") {
            if let Some(Value::Object(items)) = object.get_mut("items") {
                self.concretize_object(items);
            }
        }
    }
}

fn ref_list(urls: BTreeSet<String>) -> Vec<Value> {
    urls.into_iter()
        .map(|url| {
            let mut member = Map::new();
            member.insert("$ref".to_string(), Value::String(url));
            Value::Object(member)
        })
        .collect()
}
