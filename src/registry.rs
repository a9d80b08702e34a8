//! Component registry: `$ref` resolution and schema cycle detection.
//!
//! The registry owns the parsed document, exposes the five component
//! namespaces, and precomputes the schema reference graph so the schema
//! translator knows where to break recursion. Read-only after
//! construction.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::TranslateError;
use crate::spec::{
    AdditionalProperties, Document, Header, Parameter, RefOr, RequestBody, Response, Schema,
};

const SCHEMA_PREFIX: &str = "#/components/schemas/";
const PARAMETER_PREFIX: &str = "#/components/parameters/";
const HEADER_PREFIX: &str = "#/components/headers/";
const RESPONSE_PREFIX: &str = "#/components/responses/";
const REQUEST_BODY_PREFIX: &str = "#/components/requestBodies/";

/// Transitive `RefOr` chains longer than this are treated as cycles.
const MAX_REF_DEPTH: usize = 32;

/// A directed edge in the component schema reference graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaEdge {
    pub from: String,
    pub to: String,
}

/// Indexed view of a document's components.
#[derive(Debug)]
pub struct Registry {
    document: Document,
    /// Edges removed to make the schema reference graph acyclic, chosen
    /// deterministically (first back-edge in document order per cycle).
    back_edges: HashSet<SchemaEdge>,
    /// Schema components that sit on at least one cycle.
    cyclic: HashSet<String>,
    /// Stand-in for documents without components.
    empty_schemas: IndexMap<String, Schema>,
}

impl Registry {
    /// Index a parsed document.
    pub fn index(document: Document) -> Self {
        let (back_edges, cyclic) = match &document.components {
            Some(components) => detect_cycles(&components.schemas),
            None => (HashSet::new(), HashSet::new()),
        };
        tracing::debug!(
            schemas = document
                .components
                .as_ref()
                .map_or(0, |c| c.schemas.len()),
            back_edges = back_edges.len(),
            "indexed component registry"
        );
        Self {
            document,
            back_edges,
            cyclic,
            empty_schemas: IndexMap::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Component schemas in declaration order. Empty map when the
    /// document has no components.
    pub fn schemas(&self) -> &IndexMap<String, Schema> {
        self.document
            .components
            .as_ref()
            .map_or(&self.empty_schemas, |c| &c.schemas)
    }

    /// Strip the schemas namespace prefix, failing on foreign or
    /// non-schema references.
    pub fn schema_local_name<'a>(&self, reference: &'a str) -> Result<&'a str, TranslateError> {
        reference
            .strip_prefix(SCHEMA_PREFIX)
            .ok_or_else(|| TranslateError::UnresolvedReference {
                reference: reference.to_string(),
            })
    }

    /// Resolve a schema `$ref`, following alias chains (a component whose
    /// body is itself just a `$ref`). Returns the terminal local name and
    /// schema node.
    pub fn resolve_schema(&self, reference: &str) -> Result<(&str, &Schema), TranslateError> {
        let mut name = self.schema_local_name(reference)?;
        for _ in 0..MAX_REF_DEPTH {
            let (key, schema) = self
                .schemas()
                .get_key_value(name)
                .ok_or_else(|| TranslateError::UnresolvedReference {
                    reference: reference.to_string(),
                })?;
            match &schema.ref_path {
                Some(next) if schema.is_alias_only() => {
                    name = self.schema_local_name(next)?;
                }
                _ => return Ok((key.as_str(), schema)),
            }
        }
        Err(TranslateError::ReferenceCycle {
            reference: reference.to_string(),
        })
    }

    /// Resolve a component parameter reference.
    pub fn resolve_parameter<'a>(
        &'a self,
        item: &'a RefOr<Parameter>,
    ) -> Result<&'a Parameter, TranslateError> {
        self.resolve_ref_or(item, PARAMETER_PREFIX, |c| &c.parameters)
    }

    /// Resolve a component header reference.
    pub fn resolve_header<'a>(
        &'a self,
        item: &'a RefOr<Header>,
    ) -> Result<&'a Header, TranslateError> {
        self.resolve_ref_or(item, HEADER_PREFIX, |c| &c.headers)
    }

    /// Resolve a component response reference.
    pub fn resolve_response<'a>(
        &'a self,
        item: &'a RefOr<Response>,
    ) -> Result<&'a Response, TranslateError> {
        self.resolve_ref_or(item, RESPONSE_PREFIX, |c| &c.responses)
    }

    /// Resolve a component request body reference.
    pub fn resolve_request_body<'a>(
        &'a self,
        item: &'a RefOr<RequestBody>,
    ) -> Result<&'a RequestBody, TranslateError> {
        self.resolve_ref_or(item, REQUEST_BODY_PREFIX, |c| &c.request_bodies)
    }

    fn resolve_ref_or<'a, T>(
        &'a self,
        item: &'a RefOr<T>,
        prefix: &str,
        table: impl Fn(&crate::spec::Components) -> &IndexMap<String, RefOr<T>>,
    ) -> Result<&'a T, TranslateError> {
        let mut current = item;
        for _ in 0..MAX_REF_DEPTH {
            match current {
                RefOr::Item(value) => return Ok(value),
                RefOr::Ref { reference } => {
                    let name = reference.strip_prefix(prefix).ok_or_else(|| {
                        TranslateError::UnresolvedReference {
                            reference: reference.clone(),
                        }
                    })?;
                    current = self
                        .document
                        .components
                        .as_ref()
                        .and_then(|c| table(c).get(name))
                        .ok_or_else(|| TranslateError::UnresolvedReference {
                            reference: reference.clone(),
                        })?;
                }
            }
        }
        match item {
            RefOr::Ref { reference } => Err(TranslateError::ReferenceCycle {
                reference: reference.clone(),
            }),
            RefOr::Item(value) => Ok(value),
        }
    }

    /// Whether the edge `from -> to` is a chosen back-edge, i.e. the edge
    /// that must carry boxed storage.
    pub fn is_back_edge(&self, from: &str, to: &str) -> bool {
        self.back_edges.contains(&SchemaEdge {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Whether the named component schema owns a back-edge and therefore
    /// gets boxed storage when emitted as a product type.
    pub fn needs_boxed_storage(&self, name: &str) -> bool {
        self.back_edges.iter().any(|e| e.from == name)
    }

    /// Whether the named component schema participates in any cycle.
    pub fn is_cyclic(&self, name: &str) -> bool {
        self.cyclic.contains(name)
    }
}

impl Schema {
    /// A schema that is only a `$ref` (an alias), with no other keywords.
    fn is_alias_only(&self) -> bool {
        self.ref_path.is_some()
            && self.schema_type.is_none()
            && self.properties.is_none()
            && self.all_of.is_none()
            && self.any_of.is_none()
            && self.one_of.is_none()
            && self.items.is_none()
            && self.enum_values.is_none()
    }
}

/// Collect the component names referenced from `schema`, in document
/// order of `$ref` occurrence.
fn collect_refs(schema: &Schema, out: &mut Vec<String>) {
    if let Some(ref_path) = &schema.ref_path {
        if let Some(name) = ref_path.strip_prefix(SCHEMA_PREFIX) {
            out.push(name.to_string());
        }
    }
    if let Some(properties) = &schema.properties {
        for property in properties.values() {
            collect_refs(property, out);
        }
    }
    if let Some(AdditionalProperties::Schema(value)) = &schema.additional_properties {
        collect_refs(value, out);
    }
    if let Some(items) = &schema.items {
        collect_refs(items, out);
    }
    for group in [&schema.all_of, &schema.any_of, &schema.one_of]
        .into_iter()
        .flatten()
    {
        for child in group {
            collect_refs(child, out);
        }
    }
}

/// DFS over the component reference graph in declaration order. An edge
/// into a node on the active stack is a back-edge; removing the chosen
/// back-edges leaves the graph acyclic, and DFS order makes the choice
/// the first such edge in document order per cycle.
fn detect_cycles(schemas: &IndexMap<String, Schema>) -> (HashSet<SchemaEdge>, HashSet<String>) {
    let mut adjacency: IndexMap<&str, Vec<String>> = IndexMap::new();
    for (name, schema) in schemas {
        let mut refs = Vec::new();
        collect_refs(schema, &mut refs);
        let mut seen = HashSet::new();
        let targets: Vec<String> = refs
            .into_iter()
            .filter(|target| schemas.contains_key(target.as_str()))
            .filter(|target| seen.insert(target.clone()))
            .collect();
        adjacency.insert(name.as_str(), targets);
    }

    let mut back_edges = HashSet::new();
    let mut cyclic = HashSet::new();
    let mut finished: HashSet<&str> = HashSet::new();
    let mut on_stack: Vec<&str> = Vec::new();

    // Iterative DFS: (node, next child index).
    for root in adjacency.keys().copied().collect::<Vec<_>>() {
        if finished.contains(root) {
            continue;
        }
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        on_stack.push(root);
        while let Some((node, child_index)) = stack.pop() {
            let children = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if child_index < children.len() {
                stack.push((node, child_index + 1));
                let Some((target, _)) = adjacency.get_key_value(children[child_index].as_str())
                else {
                    continue;
                };
                let target = *target;
                if let Some(position) = on_stack.iter().position(|n| *n == target) {
                    back_edges.insert(SchemaEdge {
                        from: node.to_string(),
                        to: target.to_string(),
                    });
                    for member in &on_stack[position..] {
                        cyclic.insert((*member).to_string());
                    }
                } else if !finished.contains(target) {
                    on_stack.push(target);
                    stack.push((target, 0));
                }
            } else {
                finished.insert(node);
                on_stack.pop();
            }
        }
    }

    (back_edges, cyclic)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn registry(components_yaml: &str) -> Registry {
        let doc = Document::from_yaml(&format!(
            "openapi: '3.1.0'\ninfo: {{title: T, version: '1'}}\npaths: {{}}\ncomponents:\n{components_yaml}"
        ))
        .unwrap();
        Registry::index(doc)
    }

    #[test]
    fn test_resolve_schema() {
        let registry = registry(
            r#"
  schemas:
    Pet:
      type: object
      properties:
        name: {type: string}
"#,
        );
        let (name, schema) = registry
            .resolve_schema("#/components/schemas/Pet")
            .unwrap();
        assert_eq!(name, "Pet");
        assert!(schema.properties.is_some());
    }

    #[test]
    fn test_unresolved_reference_is_fatal() {
        let registry = registry("  schemas: {}\n");
        let err = registry
            .resolve_schema("#/components/schemas/Missing")
            .unwrap_err();
        assert!(matches!(err, TranslateError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_foreign_reference_is_fatal() {
        let registry = registry("  schemas: {}\n");
        let err = registry
            .resolve_schema("other.yaml#/components/schemas/Pet")
            .unwrap_err();
        assert!(matches!(err, TranslateError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_alias_chain_resolves_transitively() {
        let registry = registry(
            r#"
  schemas:
    A:
      $ref: '#/components/schemas/B'
    B:
      type: string
"#,
        );
        let (name, schema) = registry.resolve_schema("#/components/schemas/A").unwrap();
        assert_eq!(name, "B");
        assert_eq!(schema.single_type(), Some("string"));
    }

    #[test]
    fn test_self_reference_is_one_back_edge() {
        let registry = registry(
            r#"
  schemas:
    Node:
      type: object
      properties:
        parent:
          $ref: '#/components/schemas/Node'
"#,
        );
        assert!(registry.is_back_edge("Node", "Node"));
        assert!(registry.needs_boxed_storage("Node"));
        assert!(registry.is_cyclic("Node"));
    }

    #[test]
    fn test_two_node_cycle_breaks_once() {
        let registry = registry(
            r#"
  schemas:
    A:
      type: object
      properties:
        b: {$ref: '#/components/schemas/B'}
    B:
      type: object
      properties:
        a: {$ref: '#/components/schemas/A'}
"#,
        );
        // DFS reaches A first, descends into B, and the edge back to A is
        // the first back-edge in document order.
        assert!(registry.is_back_edge("B", "A"));
        assert!(!registry.is_back_edge("A", "B"));
        assert!(registry.needs_boxed_storage("B"));
        assert!(!registry.needs_boxed_storage("A"));
        assert!(registry.is_cyclic("A") && registry.is_cyclic("B"));
    }

    #[test]
    fn test_acyclic_references_are_not_boxed() {
        let registry = registry(
            r#"
  schemas:
    Outer:
      type: object
      properties:
        inner: {$ref: '#/components/schemas/Inner'}
    Inner:
      type: string
"#,
        );
        assert!(!registry.needs_boxed_storage("Outer"));
        assert!(!registry.is_cyclic("Outer"));
        assert!(!registry.is_cyclic("Inner"));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let registry = registry(
            r#"
  schemas:
    Top:
      type: object
      properties:
        left: {$ref: '#/components/schemas/Left'}
        right: {$ref: '#/components/schemas/Right'}
    Left:
      type: object
      properties:
        bottom: {$ref: '#/components/schemas/Bottom'}
    Right:
      type: object
      properties:
        bottom: {$ref: '#/components/schemas/Bottom'}
    Bottom:
      type: string
"#,
        );
        for name in ["Top", "Left", "Right", "Bottom"] {
            assert!(!registry.is_cyclic(name), "{name} wrongly cyclic");
        }
    }

    #[test]
    fn test_resolve_component_parameter() {
        let registry = registry(
            r#"
  schemas: {}
  parameters:
    Limit:
      name: limit
      in: query
      schema: {type: integer}
"#,
        );
        let referenced = RefOr::<Parameter>::Ref {
            reference: "#/components/parameters/Limit".to_string(),
        };
        let parameter = registry.resolve_parameter(&referenced).unwrap();
        assert_eq!(parameter.name, "limit");
    }

    #[test]
    fn test_refs_through_one_of_detected() {
        let registry = registry(
            r#"
  schemas:
    Tree:
      oneOf:
        - $ref: '#/components/schemas/Leaf'
        - $ref: '#/components/schemas/Branch'
    Leaf:
      type: string
    Branch:
      type: object
      properties:
        children:
          type: array
          items: {$ref: '#/components/schemas/Tree'}
"#,
        );
        assert!(registry.is_cyclic("Tree"));
        assert!(registry.is_cyclic("Branch"));
        assert!(!registry.is_cyclic("Leaf"));
        assert!(registry.is_back_edge("Branch", "Tree"));
    }
}
